//! Conversation interpreter for non-player characters.
//!
//! An NPC owns a graph of dialogue nodes. The [`Interpreter`](dialogue::Interpreter)
//! walks that graph one node at a time: it renders the node's text and choices
//! through an [`InputBackend`](backend::InputBackend), waits for the backend to
//! report a selection, runs the chosen action and follows wherever the action
//! sends it (a specific node, or a random pick from the frontier).

pub mod backend;
pub mod collection;
pub mod dialogue;
pub mod game;
pub mod modal;
pub mod scenario;
