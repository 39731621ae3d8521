//! The rendering and input boundary of the interpreter.
//!
//! A backend is told what to show through [`InputBackend::reset`],
//! [`add_text`](InputBackend::add_text), [`add_choice`](InputBackend::add_choice)
//! and [`add_present`](InputBackend::add_present). Each choice comes with a
//! handle; once the user (or a policy) commits to one, the backend hands the
//! matching [`Selection`] back from [`respond`](InputBackend::respond) and goes
//! quiet until the next `reset`.

pub mod automated;
pub mod terminal;

pub use automated::{
    AutomatedBackend, Pick, RandomPolicy, ScriptStep, ScriptedPolicy, SelectionPolicy,
};
pub use terminal::TerminalBackend;

use crate::collection::Item;

/// Identifies one presenting episode of an interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeId(pub(crate) u64);

/// Bound to one fixed choice of one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceHandle {
    pub(crate) episode: EpisodeId,
    pub(crate) index: usize,
}

/// Bound to the presentation offer of one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentHandle {
    pub(crate) episode: EpisodeId,
}

/// What the backend reports back once something was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Choice(ChoiceHandle),
    Present(PresentHandle, Item),
}

impl Selection {
    pub fn episode(&self) -> EpisodeId {
        match self {
            Selection::Choice(handle) => handle.episode,
            Selection::Present(handle, _) => handle.episode,
        }
    }
}

/// A single user gesture, already decoded from whatever device produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Enter or space.
    Confirm,
    /// Back out of the current sub-menu.
    Cancel,
    /// A numbered option, counting from 1.
    Number(usize),
    Key(char),
    /// No user input; automated backends act on it.
    Tick,
}

impl InputEvent {
    /// Decode one line typed at a terminal.
    pub fn parse_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Some(InputEvent::Confirm);
        }
        if let Ok(n) = trimmed.parse::<usize>() {
            return Some(InputEvent::Number(n));
        }
        match trimmed.to_lowercase().as_str() {
            "b" | "back" | "esc" => Some(InputEvent::Cancel),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(InputEvent::Key(c)),
                    _ => None,
                }
            }
        }
    }
}

/// Capabilities the interpreter needs from whatever shows the conversation.
pub trait InputBackend {
    /// Forget everything shown so far and accept input again.
    fn reset(&mut self);

    fn add_text(&mut self, text: &str);

    fn add_choice(&mut self, label: &str, on_select: ChoiceHandle);

    fn add_present(&mut self, collection: &[Item], on_select: PresentHandle);

    /// Feed one event. Returns a selection at most once between two resets.
    fn respond(&mut self, event: &InputEvent) -> Option<Selection>;
}

/// The content of the current episode as handed to a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub text: Vec<String>,
    pub choices: Vec<(String, ChoiceHandle)>,
    pub present: Option<(Vec<Item>, PresentHandle)>,
}

impl Page {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.choices.iter().map(|(label, _)| label.as_str())
    }

    pub fn items(&self) -> &[Item] {
        self.present.as_ref().map_or(&[], |(items, _)| items.as_slice())
    }

    /// Turn a pick into the selection it stands for, if the page offers it.
    pub fn selection_for(&self, pick: Pick) -> Option<Selection> {
        match pick {
            Pick::Choice(index) => self
                .choices
                .get(index)
                .map(|(_, handle)| Selection::Choice(*handle)),
            Pick::Present(index) => {
                let (items, handle) = self.present.as_ref()?;
                items
                    .get(index)
                    .map(|item| Selection::Present(*handle, item.clone()))
            }
        }
    }

    pub fn is_stalled(&self) -> bool {
        self.choices.is_empty() && self.present.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(InputEvent::parse_line("\n"), Some(InputEvent::Confirm));
        assert_eq!(InputEvent::parse_line(" 2 "), Some(InputEvent::Number(2)));
        assert_eq!(InputEvent::parse_line("B"), Some(InputEvent::Cancel));
        assert_eq!(InputEvent::parse_line("p"), Some(InputEvent::Key('p')));
        assert_eq!(InputEvent::parse_line("hello"), None);
    }

    #[test]
    fn test_page_selection_for() {
        let episode = EpisodeId(3);
        let page = Page {
            text: vec!["hi".into()],
            choices: vec![("go".into(), ChoiceHandle { episode, index: 0 })],
            present: Some((vec![Item::from("pants")], PresentHandle { episode })),
        };
        assert_eq!(
            page.selection_for(Pick::Choice(0)),
            Some(Selection::Choice(ChoiceHandle { episode, index: 0 }))
        );
        assert_eq!(page.selection_for(Pick::Choice(1)), None);
        assert_eq!(
            page.selection_for(Pick::Present(0)),
            Some(Selection::Present(PresentHandle { episode }, Item::from("pants")))
        );
        assert_eq!(page.selection_for(Pick::Present(4)), None);
        assert!(!page.is_stalled());
    }
}
