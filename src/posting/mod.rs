//! Posting platform port and its backends.

/// Recording backend used by tests and dry runs.
pub mod dry_run;

use std::error::Error;
use std::fmt;

use futures::future::BoxFuture;
use thiserror::Error;

/// Result alias for posting operations.
pub type PostingResult<T> = Result<T, PostingError>;

/// Error raised by posting backends.
#[derive(Debug, Error)]
pub enum PostingError {
    /// The platform could not be reached or answered with a server error.
    #[error("posting platform unavailable: {message}")]
    Unavailable {
        /// Human-readable failure context.
        message: String,
        /// Underlying transport error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The platform is throttling this account; retry on the next invocation.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds the platform asked us to wait.
        retry_after_secs: u64,
    },
    /// No submission exists with the given id.
    #[error("submission `{post_id}` not found")]
    NotFound {
        /// The id that could not be resolved.
        post_id: String,
    },
}

impl PostingError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        PostingError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// A live submission as the platform sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Platform-assigned stable identifier.
    pub id: String,
    /// Submission title.
    pub title: String,
    /// Submission body markdown.
    pub body: String,
    /// Whether the submission is currently stickied.
    pub stickied: bool,
}

/// Comment ordering applied to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestedSort {
    /// Newest comments first; used for live threads.
    New,
    /// Platform default ordering.
    Best,
}

impl fmt::Display for SuggestedSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestedSort::New => f.write_str("new"),
            SuggestedSort::Best => f.write_str("best"),
        }
    }
}

/// Capability surface of the posting platform.
///
/// Every operation runs under an explicit posting account: the account is a
/// per-call parameter, never state held by the lifecycle.
pub trait PostingClient: Send + Sync {
    /// Create a submission, returning its platform identifier.
    fn submit(
        &self,
        account: &str,
        subreddit: &str,
        title: &str,
        body: &str,
    ) -> BoxFuture<'static, PostingResult<Submission>>;

    /// Replace a submission's body. Re-applying an identical body is a no-op
    /// from the platform's perspective.
    fn edit(&self, account: &str, post_id: &str, body: &str)
    -> BoxFuture<'static, PostingResult<()>>;

    /// Load a submission's current state.
    fn fetch(&self, account: &str, post_id: &str) -> BoxFuture<'static, PostingResult<Submission>>;

    /// Sticky or unsticky a submission.
    fn set_sticky(
        &self,
        account: &str,
        post_id: &str,
        sticky: bool,
    ) -> BoxFuture<'static, PostingResult<()>>;

    /// Apply a suggested comment sort.
    fn set_suggested_sort(
        &self,
        account: &str,
        post_id: &str,
        sort: SuggestedSort,
    ) -> BoxFuture<'static, PostingResult<()>>;

    /// Apply a flair template to a submission.
    fn set_flair(
        &self,
        account: &str,
        post_id: &str,
        flair_template: &str,
    ) -> BoxFuture<'static, PostingResult<()>>;
}
