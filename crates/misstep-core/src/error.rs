//! Engine error types.
//!
//! Only input-shape problems and boundary failures are errors. A wrong answer
//! that matches no pattern, or a classification that ends at `prereq_unknown`,
//! is a normal result and never surfaces here.

use thiserror::Error;

/// Errors returned by the diagnosis engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller did not identify a checkpoint.
    #[error("checkpoint id is required")]
    EmptyCheckpointId,

    /// Attempt numbers start at 1.
    #[error("attempt number must be at least 1, got {0}")]
    InvalidAttempt(u32),

    /// The submitted answer does not fit the checkpoint's comparison strategy.
    #[error("answer shape mismatch: checkpoint expects {expected}, got {got}")]
    AnswerShape {
        expected: &'static str,
        got: &'static str,
    },

    /// No checkpoint with this id exists in the loaded content.
    #[error("checkpoint not found: {0}")]
    UnknownCheckpoint(String),

    /// No concept with this id exists in the concept graph.
    #[error("concept not found: {0}")]
    UnknownConcept(String),

    /// The concept graph or mastery store failed.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    /// Returns `true` if this error describes bad caller input rather than a
    /// failing collaborator.
    pub fn is_validation(&self) -> bool {
        !matches!(self, EngineError::Store(_))
    }
}
