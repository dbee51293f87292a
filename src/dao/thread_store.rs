use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::state::ThreadStatus;

use super::storage::StorageResult;

/// One persisted game thread row.
///
/// Rows are created the first time a game is seen and mutated in place on
/// every subsequent pass; they are never deleted, so terminal states remain
/// as history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameThreadRecord {
    /// Store-assigned identifier.
    pub id: i64,
    /// When the thread should (or did) go live.
    pub post_at: DateTime<Utc>,
    /// Scheduled first pitch.
    pub starts_at: DateTime<Utc>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Owning subreddit.
    pub subreddit_id: i64,
    /// External game identifier.
    pub game_pk: i64,
    /// Posting-platform identifier; `None` until a submission happens.
    pub post_id: Option<String>,
    /// Submitted title.
    pub title: Option<String>,
    /// Lifecycle status.
    pub status: ThreadStatus,
    /// Special tag, e.g. `no_hitter`.
    pub special: Option<String>,
}

/// Fields required to create a thread row.
#[derive(Debug, Clone)]
pub struct NewGameThread {
    /// When the thread should go live.
    pub post_at: DateTime<Utc>,
    /// Scheduled first pitch.
    pub starts_at: DateTime<Utc>,
    /// Owning subreddit.
    pub subreddit_id: i64,
    /// External game identifier.
    pub game_pk: i64,
    /// Posting-platform identifier, when the row records an already-live post.
    pub post_id: Option<String>,
    /// Submitted title, when known.
    pub title: Option<String>,
    /// Initial lifecycle status.
    pub status: ThreadStatus,
    /// Special tag, e.g. `no_hitter`.
    pub special: Option<String>,
}

/// Partial update applied to a thread row. `None` fields are left untouched;
/// the store stamps `updated_at` on every application.
#[derive(Debug, Clone, Default)]
pub struct ThreadUpdate {
    /// New lifecycle status.
    pub status: Option<ThreadStatus>,
    /// Newly assigned platform identifier.
    pub post_id: Option<String>,
    /// Newly assigned title.
    pub title: Option<String>,
}

/// Abstraction over the persistence layer for thread rows plus the small
/// typed key-value surface used for dedup flags and check timestamps.
pub trait ThreadStore: Send + Sync {
    /// Insert a new thread row, returning its assigned id.
    fn create_thread(&self, thread: NewGameThread) -> BoxFuture<'static, StorageResult<i64>>;
    /// Apply a partial update to an existing row.
    fn update_thread(&self, id: i64, changes: ThreadUpdate)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Look up a row by id.
    fn find_thread(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<GameThreadRecord>>>;
    /// Look up the row for a game within one subreddit.
    fn find_by_game(
        &self,
        subreddit_id: i64,
        game_pk: i64,
    ) -> BoxFuture<'static, StorageResult<Option<GameThreadRecord>>>;
    /// All rows for a subreddit that are not in a terminal state.
    fn list_unfinished(
        &self,
        subreddit_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameThreadRecord>>>;
    /// Read a string flag.
    fn get_flag(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Write a string flag.
    fn set_flag(&self, key: &str, value: &str) -> BoxFuture<'static, StorageResult<()>>;
    /// Read a timestamp value.
    fn get_timestamp(&self, key: &str)
    -> BoxFuture<'static, StorageResult<Option<DateTime<Utc>>>>;
    /// Write a timestamp value.
    fn set_timestamp(&self, key: &str, at: DateTime<Utc>)
    -> BoxFuture<'static, StorageResult<()>>;
}
