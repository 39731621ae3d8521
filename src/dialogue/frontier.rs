use rand::Rng;

use super::{DialogueError, NodeKey};

/// The pool of node keys a conversation may still enter at random.
///
/// Duplicates are allowed; a key pushed twice is twice as likely to be drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontier {
    keys: Vec<NodeKey>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the first occurrence of `key`, returning where it was.
    pub fn remove_if_present(&mut self, key: &NodeKey) -> Option<usize> {
        let index = self.keys.iter().position(|k| k == key)?;
        self.keys.remove(index);
        Some(index)
    }

    pub fn push(&mut self, key: NodeKey) {
        self.keys.push(key);
    }

    /// Draw a key uniformly at random. The key stays in the frontier until it
    /// is actually visited.
    pub fn pick_random_or_fail<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<&NodeKey, DialogueError> {
        if self.keys.is_empty() {
            return Err(DialogueError::FrontierExhausted);
        }
        Ok(&self.keys[rng.gen_range(0..self.keys.len())])
    }

    /// Put back a key taken out by [`remove_if_present`](Self::remove_if_present).
    pub(crate) fn restore(&mut self, index: usize, key: NodeKey) {
        let index = index.min(self.keys.len());
        self.keys.insert(index, key);
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.keys.contains(key)
    }

    pub fn count(&self, key: &NodeKey) -> usize {
        self.keys.iter().filter(|k| *k == key).count()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeKey> {
        self.keys.iter()
    }
}

impl FromIterator<NodeKey> for Frontier {
    fn from_iter<I: IntoIterator<Item = NodeKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl Extend<NodeKey> for Frontier {
    fn extend<I: IntoIterator<Item = NodeKey>>(&mut self, iter: I) {
        self.keys.extend(iter);
    }
}
