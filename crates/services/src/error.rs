//! Shared error types for the services crate.

use thiserror::Error;

use practice_core::evaluator::EvaluatorError;
use practice_core::model::{ItemError, SettingsError, SummaryError};
use storage::repository::StorageError;

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no items available for session")]
    EmptyPool,
    #[error("invalid session settings: {0}")]
    InvalidSettings(#[from] SettingsError),
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error("session already completed")]
    Completed,
    #[error("current item was already answered")]
    NotPresenting,
    #[error("current item has not been answered yet")]
    NotAnswered,
    #[error("session has not completed")]
    NotComplete,
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    /// True when the user must be re-prompted because their answer was blank.
    #[must_use]
    pub fn is_empty_answer(&self) -> bool {
        matches!(self, SessionError::Evaluator(EvaluatorError::EmptyAnswer))
    }
}
