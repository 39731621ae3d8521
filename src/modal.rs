//! A stack of input handler sets: only the top one receives events.
//!
//! Pushing a set interrupts whatever was live (a notice over a conversation,
//! a conversation over the menu); popping it restores the one beneath.

use std::io::{self, Write};

use log::{debug, warn};
use thiserror::Error;

use crate::backend::InputEvent;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputStackError {
    #[error("cannot pop empty input stack")]
    Empty,
}

/// What a handler set wants done after it handled an event.
pub enum Flow<C, E> {
    /// Stay live.
    Continue,
    /// Interrupt with another set; this one resumes when it is popped.
    Push(Box<dyn HandlerSet<C, E>>),
    /// Remove this set, restoring the previous one.
    Pop,
    /// Swap this set for another.
    Replace(Box<dyn HandlerSet<C, E>>),
    /// Leave the host loop.
    Quit,
}

/// One set of input handlers sharing host context `C`.
pub trait HandlerSet<C, E> {
    fn name(&self) -> &str;

    fn handle(&mut self, ctx: &mut C, event: &InputEvent) -> Result<Flow<C, E>, E>;

    fn draw(&mut self, _ctx: &mut C, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// Nothing is live; the event was dropped.
    Unhandled,
    Quit,
}

pub struct ModalInputStack<C, E> {
    layers: Vec<Box<dyn HandlerSet<C, E>>>,
}

impl<C, E> Default for ModalInputStack<C, E> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl<C, E> ModalInputStack<C, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, layer: Box<dyn HandlerSet<C, E>>) {
        debug!("Input stack push: {} (depth {})", layer.name(), self.layers.len() + 1);
        self.layers.push(layer);
    }

    pub fn pop(&mut self) -> Result<Box<dyn HandlerSet<C, E>>, InputStackError> {
        let layer = self.layers.pop().ok_or(InputStackError::Empty)?;
        debug!("Input stack pop: {} (depth {})", layer.name(), self.layers.len());
        Ok(layer)
    }

    /// Name of the live handler set.
    pub fn active(&self) -> Option<&str> {
        self.layers.last().map(|layer| layer.name())
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Whether the host's own turn loop must wait: true while any set is live.
    pub fn is_locked(&self) -> bool {
        !self.layers.is_empty()
    }

    /// Route `event` to the live set and apply the flow it asks for.
    ///
    /// A set whose handler fails is popped before the error is returned, so
    /// a broken interruption never stays in front of the one beneath it.
    pub fn dispatch(&mut self, ctx: &mut C, event: &InputEvent) -> Result<Dispatch, E> {
        let Some(layer) = self.layers.last_mut() else {
            return Ok(Dispatch::Unhandled);
        };

        match layer.handle(ctx, event) {
            Ok(Flow::Continue) => Ok(Dispatch::Handled),
            Ok(Flow::Push(next)) => {
                self.push(next);
                Ok(Dispatch::Handled)
            }
            Ok(Flow::Pop) => {
                self.layers.pop();
                Ok(Dispatch::Handled)
            }
            Ok(Flow::Replace(next)) => {
                self.layers.pop();
                self.push(next);
                Ok(Dispatch::Handled)
            }
            Ok(Flow::Quit) => Ok(Dispatch::Quit),
            Err(err) => {
                if let Some(failed) = self.layers.pop() {
                    warn!("Input handler '{}' failed; popped", failed.name());
                }
                Err(err)
            }
        }
    }

    /// Let the live set draw itself.
    pub fn draw(&mut self, ctx: &mut C, out: &mut dyn Write) -> io::Result<()> {
        match self.layers.last_mut() {
            Some(layer) => layer.draw(ctx, out),
            None => Ok(()),
        }
    }
}
