use std::fmt;

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};

use super::{ActionContext, Npc, NpcState};
use crate::collection::Item;

/// Identifier of a node within one conversation graph.
///
/// Numeric and textual spellings of a key are the same key: `NodeKey::from(0)`
/// equals `NodeKey::from("0")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// The conventional primary entry point, key `0`.
    pub fn entry() -> Self {
        Self::from(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<i32> for NodeKey {
    fn from(key: i32) -> Self {
        Self(key.to_string())
    }
}

impl From<u32> for NodeKey {
    fn from(key: u32) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self(n.to_string()),
            Raw::Text(s) => Self(s),
        })
    }
}

/// Runs when a fixed choice is selected.
pub type Action = Box<dyn FnOnce(&mut NpcState, &mut ActionContext)>;

/// Runs when an item is presented; receives the presented item.
pub type PresentAction = Box<dyn FnOnce(&mut NpcState, &mut ActionContext, &Item)>;

/// A labelled option shown under the node's text.
pub struct FixedChoice {
    pub label: String,
    pub action: Action,
}

/// An offer to present one item out of a host-provided collection.
pub struct PresentationChoice {
    /// Which collection the host should offer, e.g. `"things"`.
    pub collection_kind: String,
    pub action: PresentAction,
}

/// What a node offers the player.
#[derive(Default)]
pub struct ChoiceSet {
    pub fixed_choices: Vec<FixedChoice>,
    pub presentation: Option<PresentationChoice>,
}

impl ChoiceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn choice(
        mut self,
        label: impl Into<String>,
        action: impl FnOnce(&mut NpcState, &mut ActionContext) + 'static,
    ) -> Self {
        self.fixed_choices.push(FixedChoice {
            label: label.into(),
            action: Box::new(action),
        });
        self
    }

    pub fn present(
        mut self,
        collection_kind: impl Into<String>,
        action: impl FnOnce(&mut NpcState, &mut ActionContext, &Item) + 'static,
    ) -> Self {
        self.presentation = Some(PresentationChoice {
            collection_kind: collection_kind.into(),
            action: Box::new(action),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fixed_choices.is_empty() && self.presentation.is_none()
    }
}

impl fmt::Debug for ChoiceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.fixed_choices.iter().map(|c| c.label.as_str()).collect();
        f.debug_struct("ChoiceSet")
            .field("fixed_choices", &labels)
            .field(
                "presentation",
                &self.presentation.as_ref().map(|p| &p.collection_kind),
            )
            .finish()
    }
}

/// One state of a conversation.
///
/// Rendering must not touch shared state; only actions mutate the NPC. The
/// interpreter hands in its random source so that text variants stay
/// reproducible under a fixed seed.
pub trait Node {
    fn render_text(&self, npc: &Npc, rng: &mut dyn RngCore) -> String;

    fn render_choices(&self, npc: &Npc) -> ChoiceSet;
}

enum TextSource {
    Fixed(String),
    Variants(Vec<String>),
    Computed(Box<dyn Fn(&Npc) -> String>),
}

type ChoiceFn = Box<dyn Fn(&Npc) -> ChoiceSet>;

/// A node assembled from closures.
pub struct DialogueNode {
    text: TextSource,
    choices: Option<ChoiceFn>,
}

impl DialogueNode {
    /// A node that always says `text` and offers nothing until choices are added.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: TextSource::Fixed(text.into()),
            choices: None,
        }
    }

    /// A node that says one of `variants`, picked at random on every visit.
    pub fn variants<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: TextSource::Variants(variants.into_iter().map(Into::into).collect()),
            choices: None,
        }
    }

    /// A node whose text is computed from the NPC.
    pub fn computed(text: impl Fn(&Npc) -> String + 'static) -> Self {
        Self {
            text: TextSource::Computed(Box::new(text)),
            choices: None,
        }
    }

    pub fn with_choices(mut self, choices: impl Fn(&Npc) -> ChoiceSet + 'static) -> Self {
        self.choices = Some(Box::new(choices));
        self
    }
}

impl Node for DialogueNode {
    fn render_text(&self, npc: &Npc, rng: &mut dyn RngCore) -> String {
        match &self.text {
            TextSource::Fixed(text) => text.clone(),
            TextSource::Variants(variants) => variants.choose(rng).cloned().unwrap_or_default(),
            TextSource::Computed(text) => text(npc),
        }
    }

    fn render_choices(&self, npc: &Npc) -> ChoiceSet {
        self.choices
            .as_ref()
            .map_or_else(ChoiceSet::new, |choices| choices(npc))
    }
}
