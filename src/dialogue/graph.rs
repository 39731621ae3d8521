use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DialogueError, Node, NodeKey};

/// The nodes of one NPC's conversation, keyed by [`NodeKey`].
#[derive(Default)]
pub struct ConversationGraph {
    nodes: BTreeMap<NodeKey, Box<dyn Node>>,
}

impl ConversationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, key: impl Into<NodeKey>, node: impl Node + 'static) -> Self {
        self.insert(key, node);
        self
    }

    pub fn insert(&mut self, key: impl Into<NodeKey>, node: impl Node + 'static) {
        self.nodes.insert(key.into(), Box::new(node));
    }

    /// Resolve a key. This is the only check the graph ever performs: a
    /// dangling jump is found when it is taken, not before.
    pub fn lookup(&self, key: &NodeKey) -> Result<&dyn Node, DialogueError> {
        self.nodes
            .get(key)
            .map(|node| node.as_ref())
            .ok_or_else(|| DialogueError::UnknownNode(key.clone()))
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.nodes.keys()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Debug for ConversationGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.nodes.keys()).finish()
    }
}

/// Free-form per-NPC variables, mutated only by actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NpcState(BTreeMap<String, Value>);

impl NpcState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// Whether `key` holds a truthy flag (`true` or a non-zero number).
    pub fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        }
    }

    /// Add `by` to an integer variable, treating a missing or non-integer
    /// value as zero. Returns the new value.
    pub fn increment(&mut self, key: &str, by: i64) -> i64 {
        let next = self.get_i64(key).unwrap_or(0).saturating_add(by);
        self.0.insert(key.to_owned(), Value::from(next));
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// A character that can be talked to.
#[derive(Debug)]
pub struct Npc {
    identity: String,
    pub state: NpcState,
    graph: ConversationGraph,
}

impl Npc {
    pub fn new(identity: impl Into<String>, graph: ConversationGraph) -> Self {
        Self {
            identity: identity.into(),
            state: NpcState::default(),
            graph,
        }
    }

    pub fn with_state(mut self, state: NpcState) -> Self {
        self.state = state;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn graph(&self) -> &ConversationGraph {
        &self.graph
    }
}
