use std::collections::VecDeque;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;

use super::{ChoiceHandle, InputBackend, InputEvent, Page, PresentHandle, Selection};
use crate::collection::Item;

/// Which offered option a policy settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// Index into the fixed choices.
    Choice(usize),
    /// Index into the presentable collection.
    Present(usize),
}

/// Decides what an [`AutomatedBackend`] selects.
pub trait SelectionPolicy {
    /// Pick something from `page`, or nothing to leave the page waiting.
    fn pick(&mut self, page: &Page) -> Option<Pick>;
}

/// Picks uniformly among every fixed choice and every presentable item.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionPolicy for RandomPolicy {
    fn pick(&mut self, page: &Page) -> Option<Pick> {
        let choices = page.choices.len();
        let total = choices + page.items().len();
        if total == 0 {
            return None;
        }
        let n = self.rng.gen_range(0..total);
        Some(if n < choices {
            Pick::Choice(n)
        } else {
            Pick::Present(n - choices)
        })
    }
}

/// One step of a scripted playthrough.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Select the first fixed choice whose label matches.
    Choose(Regex),
    /// Present the first item whose name matches.
    Present(Regex),
}

impl ScriptStep {
    /// Parse `pattern` or `present:pattern`. Patterns match case-insensitively.
    pub fn parse(step: &str) -> Result<Self, regex::Error> {
        match step.strip_prefix("present:") {
            Some(pattern) => Ok(ScriptStep::Present(Regex::new(&format!("(?i){pattern}"))?)),
            None => Ok(ScriptStep::Choose(Regex::new(&format!("(?i){step}"))?)),
        }
    }
}

/// Replays a fixed list of steps, one per page.
///
/// A step that matches nothing on the current page is kept for the next page;
/// once the script runs dry the policy stops selecting.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPolicy {
    steps: VecDeque<ScriptStep>,
}

impl ScriptedPolicy {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    pub fn parse<S: AsRef<str>>(steps: &[S]) -> Result<Self, regex::Error> {
        steps
            .iter()
            .map(|s| ScriptStep::parse(s.as_ref()))
            .collect::<Result<VecDeque<_>, _>>()
            .map(|steps| Self { steps })
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl SelectionPolicy for ScriptedPolicy {
    fn pick(&mut self, page: &Page) -> Option<Pick> {
        let pick = match self.steps.front()? {
            ScriptStep::Choose(re) => page.labels().position(|l| re.is_match(l)).map(Pick::Choice),
            ScriptStep::Present(re) => page
                .items()
                .iter()
                .position(|item| re.is_match(item.name()))
                .map(Pick::Present),
        };
        if pick.is_some() {
            self.steps.pop_front();
        } else {
            debug!("Script step {:?} matches nothing on this page", self.steps.front());
        }
        pick
    }
}

/// Selects without a human, through a [`SelectionPolicy`].
///
/// Nothing is drawn; the page is kept so hosts can print a transcript.
#[derive(Debug)]
pub struct AutomatedBackend<P> {
    page: Page,
    policy: P,
    spent: bool,
    last_pick: Option<Pick>,
}

impl<P: SelectionPolicy> AutomatedBackend<P> {
    pub fn new(policy: P) -> Self {
        Self {
            page: Page::default(),
            policy,
            spent: false,
            last_pick: None,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// The pick behind the last delivered selection, cleared on read.
    pub fn take_pick(&mut self) -> Option<Pick> {
        self.last_pick.take()
    }
}

impl<P: SelectionPolicy> InputBackend for AutomatedBackend<P> {
    fn reset(&mut self) {
        self.page = Page::default();
        self.spent = false;
    }

    fn add_text(&mut self, text: &str) {
        self.page.text.push(text.to_owned());
    }

    fn add_choice(&mut self, label: &str, on_select: ChoiceHandle) {
        self.page.choices.push((label.to_owned(), on_select));
    }

    fn add_present(&mut self, collection: &[Item], on_select: PresentHandle) {
        self.page.present = Some((collection.to_vec(), on_select));
    }

    fn respond(&mut self, _event: &InputEvent) -> Option<Selection> {
        if self.spent {
            return None;
        }
        let pick = self.policy.pick(&self.page)?;
        let selection = self.page.selection_for(pick)?;
        info!("Automated pick: {pick:?}");
        self.spent = true;
        self.last_pick = Some(pick);
        Some(selection)
    }
}
