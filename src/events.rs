//! User-facing progress events.
//!
//! Stages never print. They send [`BuildEvent`]s over an optional channel and
//! the CLI drains it on a printer thread, formatting each event with
//! [`crate::output::format_event`]. Library callers and tests pass `None` and
//! nothing is emitted.
//!
//! Internal diagnostics go through `tracing` instead; events are for the
//! person running the build.

use crate::types::Stage;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEvent {
    pub level: Level,
    pub stage: Stage,
    /// Recipe path, when the event concerns a single recipe.
    pub recipe: Option<String>,
    pub message: String,
}

impl BuildEvent {
    pub fn info(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            stage,
            recipe: None,
            message: message.into(),
        }
    }

    pub fn warn(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            level: Level::Warn,
            stage,
            recipe: None,
            message: message.into(),
        }
    }

    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            stage,
            recipe: None,
            message: message.into(),
        }
    }

    pub fn for_recipe(mut self, recipe: impl Into<String>) -> Self {
        self.recipe = Some(recipe.into());
        self
    }
}

/// Optional progress channel handed to every stage.
pub type EventSender = Option<Sender<BuildEvent>>;

/// Send an event if a listener is attached. A disconnected receiver is ignored.
pub fn emit(events: &EventSender, event: BuildEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}
