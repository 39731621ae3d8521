use std::io::{self, Write};

use log::debug;

use super::{ChoiceHandle, InputBackend, InputEvent, Page, Pick, PresentHandle, Selection};
use crate::collection::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Numbered choices are live.
    Choosing,
    /// The presentable collection is listed.
    Picking,
    /// An item is held up, waiting for confirmation.
    Confirming(usize),
    /// A selection was delivered; input stays off until the next reset.
    Spent,
}

/// Renders the conversation as plain text and reads numbered choices.
///
/// `1..n` select a choice, `p` opens the collection when something can be
/// presented, a number then picks an item and enter confirms it. `b` backs
/// out of the collection.
#[derive(Debug)]
pub struct TerminalBackend {
    page: Page,
    mode: Mode,
    dirty: bool,
}

impl Default for TerminalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalBackend {
    pub fn new() -> Self {
        Self {
            page: Page::default(),
            mode: Mode::Choosing,
            dirty: false,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Whether the surface changed since it was last drawn.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Draw the current page if anything changed since the last draw.
    pub fn draw(&mut self, out: &mut dyn Write) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;

        writeln!(out)?;
        for text in &self.page.text {
            writeln!(out, "{text}")?;
        }
        writeln!(out)?;

        match self.mode {
            Mode::Choosing => {
                for (i, label) in self.page.labels().enumerate() {
                    writeln!(out, "  [{}] {label}", i + 1)?;
                }
                if self.page.present.is_some() {
                    writeln!(out, "  [p] present something")?;
                }
            }
            Mode::Picking => {
                writeln!(out, "What do you present?")?;
                for (i, item) in self.page.items().iter().enumerate() {
                    writeln!(out, "  [{}] {item}", i + 1)?;
                }
                writeln!(out, "  [b] back")?;
            }
            Mode::Confirming(index) => {
                if let Some(item) = self.page.items().get(index) {
                    writeln!(out, "You hold up the {item}. [enter] present, [b] back")?;
                }
            }
            Mode::Spent => {}
        }
        out.flush()
    }

    fn goto(&mut self, mode: Mode) -> Option<Selection> {
        debug!("Terminal input mode {:?} -> {mode:?}", self.mode);
        self.mode = mode;
        self.dirty = true;
        None
    }

    fn deliver(&mut self, selection: Option<Selection>) -> Option<Selection> {
        if selection.is_some() {
            self.mode = Mode::Spent;
        }
        selection
    }
}

impl InputBackend for TerminalBackend {
    fn reset(&mut self) {
        self.page = Page::default();
        self.mode = Mode::Choosing;
        self.dirty = true;
    }

    fn add_text(&mut self, text: &str) {
        self.page.text.push(text.to_owned());
        self.dirty = true;
    }

    fn add_choice(&mut self, label: &str, on_select: ChoiceHandle) {
        self.page.choices.push((label.to_owned(), on_select));
        self.dirty = true;
    }

    fn add_present(&mut self, collection: &[Item], on_select: PresentHandle) {
        self.page.present = Some((collection.to_vec(), on_select));
        self.dirty = true;
    }

    fn respond(&mut self, event: &InputEvent) -> Option<Selection> {
        match (self.mode, event) {
            (Mode::Spent, _) => None,
            (Mode::Choosing, InputEvent::Number(n)) if *n >= 1 => {
                let selection = self.page.selection_for(Pick::Choice(n - 1));
                self.deliver(selection)
            }
            (Mode::Choosing, InputEvent::Key('p')) if self.page.present.is_some() => {
                self.goto(Mode::Picking)
            }
            (Mode::Picking | Mode::Confirming(_), InputEvent::Number(n))
                if *n >= 1 && *n <= self.page.items().len() =>
            {
                self.goto(Mode::Confirming(n - 1))
            }
            (Mode::Picking, InputEvent::Cancel) => self.goto(Mode::Choosing),
            (Mode::Confirming(_), InputEvent::Cancel) => self.goto(Mode::Picking),
            (Mode::Confirming(index), InputEvent::Confirm) => {
                let selection = self.page.selection_for(Pick::Present(index));
                self.deliver(selection)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EpisodeId;

    fn backend() -> TerminalBackend {
        let episode = EpisodeId(1);
        let mut backend = TerminalBackend::new();
        backend.reset();
        backend.add_text("catelyn: I have no time to waste.");
        backend.add_choice("Children", ChoiceHandle { episode, index: 0 });
        backend.add_choice("Royalty", ChoiceHandle { episode, index: 1 });
        backend.add_present(
            &[Item::from("goblet"), Item::from("pants")],
            PresentHandle { episode },
        );
        backend
    }

    fn render(backend: &mut TerminalBackend) -> String {
        let mut out = Vec::new();
        backend.draw(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_number_selects_choice() {
        let mut backend = backend();
        assert_eq!(backend.respond(&InputEvent::Number(3)), None);
        assert_eq!(backend.respond(&InputEvent::Number(0)), None);
        assert_eq!(
            backend.respond(&InputEvent::Number(2)),
            Some(Selection::Choice(ChoiceHandle {
                episode: EpisodeId(1),
                index: 1
            }))
        );
    }

    #[test]
    fn test_only_one_selection_per_page() {
        let mut backend = backend();
        assert!(backend.respond(&InputEvent::Number(1)).is_some());
        assert_eq!(backend.respond(&InputEvent::Number(1)), None);
        assert_eq!(backend.respond(&InputEvent::Number(2)), None);

        backend.reset();
        backend.add_choice(
            "again",
            ChoiceHandle {
                episode: EpisodeId(2),
                index: 0,
            },
        );
        assert!(backend.respond(&InputEvent::Number(1)).is_some());
    }

    #[test]
    fn test_present_needs_pick_then_confirm() {
        let mut backend = backend();
        assert_eq!(backend.respond(&InputEvent::Confirm), None);
        assert_eq!(backend.respond(&InputEvent::Key('p')), None);
        assert_eq!(backend.respond(&InputEvent::Number(2)), None);
        assert_eq!(
            backend.respond(&InputEvent::Confirm),
            Some(Selection::Present(
                PresentHandle {
                    episode: EpisodeId(1)
                },
                Item::from("pants")
            ))
        );
        assert_eq!(backend.respond(&InputEvent::Confirm), None);
    }

    #[test]
    fn test_cancel_backs_out() {
        let mut backend = backend();
        backend.respond(&InputEvent::Key('p'));
        backend.respond(&InputEvent::Number(1));
        backend.respond(&InputEvent::Cancel);
        backend.respond(&InputEvent::Cancel);
        assert!(matches!(
            backend.respond(&InputEvent::Number(1)),
            Some(Selection::Choice(_))
        ));
    }

    #[test]
    fn test_present_key_ignored_without_presentation() {
        let mut backend = TerminalBackend::new();
        backend.reset();
        backend.add_text("you win");
        assert_eq!(backend.respond(&InputEvent::Key('p')), None);
        assert!(render(&mut backend).contains("you win"));
    }

    #[test]
    fn test_draw_lists_choices_once() {
        let mut backend = backend();
        let screen = render(&mut backend);
        assert!(screen.contains("[1] Children"));
        assert!(screen.contains("[2] Royalty"));
        assert!(screen.contains("[p] present something"));
        assert!(!backend.is_dirty());
        assert_eq!(render(&mut backend), "");

        backend.respond(&InputEvent::Key('p'));
        let screen = render(&mut backend);
        assert!(screen.contains("[2] pants"));
        backend.respond(&InputEvent::Number(1));
        assert!(render(&mut backend).contains("You hold up the goblet."));
    }
}
