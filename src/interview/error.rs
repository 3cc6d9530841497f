//! Errors surfaced by the interview orchestrator.

use thiserror::Error;
use uuid::Uuid;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum InterviewError {
    /// AI call failures propagate unchanged.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("an interview is already in progress")]
    SessionConflict,

    #[error("interview incomplete: {answered} of {total} questions answered")]
    InterviewIncomplete { answered: usize, total: usize },

    #[error("interview session not found: {0}")]
    SessionNotFound(String),
}

impl InterviewError {
    pub fn not_found(id: Option<Uuid>) -> Self {
        match id {
            Some(id) => Self::SessionNotFound(id.to_string()),
            None => Self::SessionNotFound("no interview has been started".into()),
        }
    }
}
