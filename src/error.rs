//! Service-level error taxonomy.

use thiserror::Error;

use crate::dao::storage::StorageError;
use crate::feed::FeedError;
use crate::posting::PostingError;
use crate::state::InvalidTransition;

/// Errors that can occur while running a pass.
///
/// The taxonomy drives retry behavior: configuration errors abort the
/// affected subreddit's pass, transient upstream errors skip the current
/// game until the next scheduled invocation, data errors leave stored state
/// untouched, and invariant violations mark a bug without performing the
/// offending side effect.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing template or invalid subreddit settings; fatal for the
    /// affected subreddit's pass.
    #[error("configuration error: {0}")]
    Config(String),
    /// The game feed could not be reached; retried on the next invocation.
    #[error("game feed error")]
    Feed(#[from] FeedError),
    /// The posting platform rejected or dropped an operation; retried on the
    /// next invocation.
    #[error("posting platform error")]
    Posting(#[from] PostingError),
    /// The store could not be reached.
    #[error("storage error")]
    Storage(#[from] StorageError),
    /// The feed reported something the state machine does not recognize;
    /// stored status is left unchanged.
    #[error("inconsistent upstream data: {0}")]
    Data(String),
    /// An operation would break a lifecycle invariant (e.g. submitting when
    /// a post id already exists); skipped and surfaced loudly.
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::Data(err.to_string())
    }
}

impl ServiceError {
    /// Whether the error is expected to clear by itself on a later
    /// invocation, as opposed to needing operator attention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::Feed(_) | ServiceError::Posting(_) | ServiceError::Storage(_)
        )
    }
}
