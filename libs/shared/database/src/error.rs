use thiserror::Error;

use shared_models::error::ServiceError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Missing row: {0}")]
    Missing(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            // The row vanished between read and write, e.g. a concurrent delete.
            StorageError::Missing(what) => ServiceError::NotFound(format!("{} not found", what)),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
