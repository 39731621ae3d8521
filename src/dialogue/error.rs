use thiserror::Error;

use super::NodeKey;

/// Everything that can go wrong while driving a conversation.
///
/// None of these are transient: they point at a bug in the conversation graph,
/// the host, or the input backend, so nothing is ever retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogueError {
    /// A visit or jump named a node the graph does not contain.
    #[error("no node '{0}' in the conversation graph")]
    UnknownNode(NodeKey),

    /// A presentation asked for a collection the host cannot provide.
    #[error("invalid choice type '{0}'")]
    UnsupportedCollection(String),

    /// `resume` or a random visit found nothing left in the frontier.
    #[error("ran out of choices in frontier")]
    FrontierExhausted,

    /// The backend delivered a selection that does not belong to the live episode.
    #[error("backend protocol violation: {0}")]
    BackendProtocolViolation(String),

    /// The host asked to talk to someone who is not in the cast.
    #[error("nobody to talk to at position {0}")]
    UnknownNpc(usize),

    /// The host tore the session down; start a new one first.
    #[error("conversation session has ended")]
    SessionEnded,
}
