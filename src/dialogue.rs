mod error;
mod frontier;
mod graph;
mod interpreter;
mod node;

pub use error::DialogueError;
pub use frontier::Frontier;
pub use graph::{ConversationGraph, Npc, NpcState};
pub use interpreter::{ActionContext, Interpreter, Navigation, Phase, Transition};
pub use node::{
    Action, ChoiceSet, DialogueNode, FixedChoice, Node, NodeKey, PresentAction,
    PresentationChoice,
};
