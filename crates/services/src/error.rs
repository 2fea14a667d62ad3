//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AnswerLabel, QuestionError, QuestionKey, SessionSummaryError, SetId};
use storage::repository::StorageError;

use crate::sessions::SessionState;

/// Errors emitted by `QuestionStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionStoreError {
    #[error("question {0} no longer exists in its set")]
    NotFound(QuestionKey),
    #[error("unknown question set: {0}")]
    UnknownSet(SetId),
    #[error("no question set selected")]
    NoSetsSelected,
    #[error(transparent)]
    Validation(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LedgerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("failed to save attempt history: {0}")]
    Save(#[source] StorageError),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    /// The mistakes pool is empty. Not a failure: nothing is left to review.
    #[error("no incorrectly answered questions to review")]
    NothingToReview,
    #[error("session already completed")]
    Completed,
    #[error("operation needs a {expected:?} session, current state is {actual:?}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },
    #[error("answer {label} does not match any of the {options} options")]
    InvalidLabel { label: AnswerLabel, options: usize },
    #[error("option order covers {given} options, question has {expected}")]
    OptionCountMismatch { given: usize, expected: usize },
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Store(#[from] QuestionStoreError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Store(#[from] QuestionStoreError),
}
