//! Game feed port and its backends.

/// Fixture backend serving canned snapshots.
pub mod fixture;
/// Typed snapshot model for live game state.
pub mod models;
/// StatsAPI-backed feed implementation.
#[cfg(feature = "statsapi")]
pub mod statsapi;

use std::error::Error;

use chrono::NaiveDate;
use futures::future::BoxFuture;
use thiserror::Error;

use self::models::{ScheduledGame, Snapshot};

/// Result alias for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Error raised by feed backends regardless of the underlying transport.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed could not be reached; distinguishable from empty data so
    /// callers skip the game instead of acting on zeroed statistics.
    #[error("game feed unavailable: {message}")]
    Unavailable {
        /// Human-readable failure context.
        message: String,
        /// Underlying transport error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The feed has no data for the requested game.
    #[error("game {game_pk} not found in feed")]
    NotFound {
        /// The identifier that was requested.
        game_pk: i64,
    },
}

impl FeedError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        FeedError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Abstraction over the live game feed.
pub trait GameFeed: Send + Sync {
    /// List the games scheduled for the given day.
    fn schedule(&self, day: NaiveDate) -> BoxFuture<'static, FeedResult<Vec<ScheduledGame>>>;
    /// Fetch the live snapshot for one game.
    fn fetch(&self, game_pk: i64) -> BoxFuture<'static, FeedResult<Snapshot>>;
}
