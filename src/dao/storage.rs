use std::error::Error;

use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by store backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Human-readable failure context.
        message: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// No thread row exists with the given id.
    #[error("thread row {id} not found")]
    RowNotFound {
        /// The row id that was requested.
        id: i64,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
