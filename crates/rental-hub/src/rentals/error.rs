use super::lifecycle::TransitionRejected;
use super::repository::{BlobError, RepositoryError};

/// Error raised by the rental service. Each message names the failed precondition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RentalError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not authorized: {0}")]
    Authorization(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("image storage failed: {0}")]
    Blob(#[from] BlobError),
}

impl RentalError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub(crate) fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Authorization(reason.into())
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            RentalError::Validation(_) => "validation",
            RentalError::Authorization(_) => "authorization",
            RentalError::InvalidState(_) => "invalid_state",
            RentalError::NotFound { .. } => "not_found",
            RentalError::Repository(_) => "repository",
            RentalError::Blob(_) => "blob",
        }
    }
}

impl From<TransitionRejected> for RentalError {
    fn from(value: TransitionRejected) -> Self {
        Self::InvalidState(value.to_string())
    }
}
