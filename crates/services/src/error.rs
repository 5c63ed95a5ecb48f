//! Shared error types for the services crate.

use thiserror::Error;

use lingua_core::numbers::NumberRangeError;
use lingua_core::verify::VerifyError;
use storage::repository::StorageError;

use crate::dialogue::DialogueStage;

/// Errors emitted by practice sessions.
///
/// Running out of items is not an error: it moves the session to its
/// completed phase instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no filter criteria chosen yet")]
    NoCriteria,
    #[error("no item is currently presented")]
    NoItem,
    #[error("an item is already presented")]
    ItemPending,
    #[error("session already completed")]
    Completed,
    #[error("a verification is already in progress")]
    VerificationInFlight,
    #[error("no verification in progress")]
    NotVerifying,
    #[error("the recording is empty")]
    EmptyRecording,
    #[error("invalid answer: {0}")]
    InvalidAnswer(#[from] VerifyError),
    #[error("{service} service unavailable: {source}")]
    Service {
        service: &'static str,
        #[source]
        source: StorageError,
    },
}

/// Errors emitted by number pronunciation practice.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NumberPracticeError {
    #[error(transparent)]
    Range(#[from] NumberRangeError),
    #[error("write the number out and/or record it before verifying")]
    NoAnswer,
    #[error("could not read the judge's reply: {0}")]
    UnparseableReply(String),
    #[error("{service} service unavailable: {source}")]
    Service {
        service: &'static str,
        #[source]
        source: StorageError,
    },
}

/// Errors emitted by dialogue practice.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DialoguePracticeError {
    #[error("not possible during the {0} stage")]
    WrongStage(DialogueStage),
    #[error("the current phrase was already answered")]
    AlreadyAnswered,
    #[error("the recording is empty")]
    EmptyRecording,
    #[error("could not read the judge's reply: {0}")]
    UnparseableReply(String),
    #[error("{service} service unavailable: {source}")]
    Service {
        service: &'static str,
        #[source]
        source: StorageError,
    },
}
