//! Shared types for the conversational core.

use crate::error::ChatError;
use crate::session::SessionContext;

/// Entities resolved for one turn.
///
/// `part`, `model`, and `order` are the raw strings as extracted from the
/// message (or substituted from context, in which case they arrive already
/// normalized). `context` is the session snapshot after this turn's
/// write-back.
#[derive(Clone, Debug, Default)]
pub struct ResolvedEntities {
    pub part: Option<String>,
    pub model: Option<String>,
    pub order: Option<String>,
    pub context: SessionContext,
}

/// Typed result of one turn.
///
/// Clarifications and not-found lookups are normal answers; only
/// external-collaborator faults become `Failed`. The transport layer
/// decides how to render a failure; [`TurnOutcome::render`] reproduces
/// the legacy always-a-string interface.
#[derive(Debug)]
pub enum TurnOutcome {
    Answer(String),
    Failed(ChatError),
}

impl TurnOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TurnOutcome::Failed(_))
    }

    /// The answer text, if the turn succeeded.
    pub fn answer(&self) -> Option<&str> {
        match self {
            TurnOutcome::Answer(text) => Some(text),
            TurnOutcome::Failed(_) => None,
        }
    }

    /// Collapse a failure into the user-visible error string.
    pub fn render(&self) -> String {
        match self {
            TurnOutcome::Answer(text) => text.clone(),
            TurnOutcome::Failed(err) => format!("Internal server error: {}", err),
        }
    }
}
