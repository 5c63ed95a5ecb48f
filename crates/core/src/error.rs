use thiserror::Error;

use crate::model::{DialogueError, KnowledgeError};
use crate::numbers::NumberRangeError;
use crate::verify::VerifyError;

/// Any validation failure raised by the core crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    NumberRange(#[from] NumberRangeError),
    #[error(transparent)]
    Dialogue(#[from] DialogueError),
}
