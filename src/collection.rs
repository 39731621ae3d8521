//! Host-provided collections a node can ask the player to present from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dialogue::DialogueError;

/// Something the player can hold up to an NPC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(String);

impl Item {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Item {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for Item {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collections known to the host, by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionRegistry {
    collections: BTreeMap<String, Vec<Item>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection<I, S>(mut self, kind: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Item>,
    {
        self.register(kind, items);
        self
    }

    /// Register (or replace) the items offered for `kind`.
    pub fn register<I, S>(&mut self, kind: impl Into<String>, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<Item>,
    {
        self.collections
            .insert(kind.into(), items.into_iter().map(Into::into).collect());
    }

    pub fn resolve(&self, kind: &str) -> Result<&[Item], DialogueError> {
        self.collections
            .get(kind)
            .map(Vec::as_slice)
            .ok_or_else(|| DialogueError::UnsupportedCollection(kind.to_owned()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}
