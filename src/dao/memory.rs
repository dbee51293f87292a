use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::BoxFuture;

use super::{
    storage::{StorageError, StorageResult},
    thread_store::{GameThreadRecord, NewGameThread, ThreadStore, ThreadUpdate},
};

/// In-memory thread store.
///
/// The default backend for tests and dry runs; real deployments plug a
/// database-backed implementation into the same trait.
#[derive(Debug, Default)]
pub struct InMemoryThreadStore {
    next_id: AtomicI64,
    threads: DashMap<i64, GameThreadRecord>,
    flags: DashMap<String, String>,
    timestamps: DashMap<String, DateTime<Utc>>,
}

impl InMemoryThreadStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }
}

impl ThreadStore for InMemoryThreadStore {
    fn create_thread(&self, thread: NewGameThread) -> BoxFuture<'static, StorageResult<i64>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        self.threads.insert(
            id,
            GameThreadRecord {
                id,
                post_at: thread.post_at,
                starts_at: thread.starts_at,
                created_at: now,
                updated_at: now,
                subreddit_id: thread.subreddit_id,
                game_pk: thread.game_pk,
                post_id: thread.post_id,
                title: thread.title,
                status: thread.status,
                special: thread.special,
            },
        );
        Box::pin(async move { Ok(id) })
    }

    fn update_thread(
        &self,
        id: i64,
        changes: ThreadUpdate,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let result = match self.threads.get_mut(&id) {
            Some(mut entry) => {
                if let Some(status) = changes.status {
                    entry.status = status;
                }
                if let Some(post_id) = changes.post_id {
                    entry.post_id = Some(post_id);
                }
                if let Some(title) = changes.title {
                    entry.title = Some(title);
                }
                entry.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StorageError::RowNotFound { id }),
        };
        Box::pin(async move { result })
    }

    fn find_thread(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<GameThreadRecord>>> {
        let found = self.threads.get(&id).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(found) })
    }

    fn find_by_game(
        &self,
        subreddit_id: i64,
        game_pk: i64,
    ) -> BoxFuture<'static, StorageResult<Option<GameThreadRecord>>> {
        let found = self
            .threads
            .iter()
            .find(|entry| entry.subreddit_id == subreddit_id && entry.game_pk == game_pk)
            .map(|entry| entry.value().clone());
        Box::pin(async move { Ok(found) })
    }

    fn list_unfinished(
        &self,
        subreddit_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<GameThreadRecord>>> {
        let mut rows: Vec<GameThreadRecord> = self
            .threads
            .iter()
            .filter(|entry| entry.subreddit_id == subreddit_id && !entry.status.is_terminal())
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|row| row.id);
        Box::pin(async move { Ok(rows) })
    }

    fn get_flag(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let value = self.flags.get(key).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(value) })
    }

    fn set_flag(&self, key: &str, value: &str) -> BoxFuture<'static, StorageResult<()>> {
        self.flags.insert(key.to_owned(), value.to_owned());
        Box::pin(async move { Ok(()) })
    }

    fn get_timestamp(
        &self,
        key: &str,
    ) -> BoxFuture<'static, StorageResult<Option<DateTime<Utc>>>> {
        let value = self.timestamps.get(key).map(|entry| *entry.value());
        Box::pin(async move { Ok(value) })
    }

    fn set_timestamp(
        &self,
        key: &str,
        at: DateTime<Utc>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.timestamps.insert(key.to_owned(), at);
        Box::pin(async move { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use crate::state::ThreadStatus;

    use super::*;

    fn new_thread(subreddit_id: i64, game_pk: i64) -> NewGameThread {
        let now = Utc::now();
        NewGameThread {
            post_at: now,
            starts_at: now,
            subreddit_id,
            game_pk,
            post_id: None,
            title: None,
            status: ThreadStatus::Future,
            special: None,
        }
    }

    #[tokio::test]
    async fn create_then_find_by_game() {
        let store = InMemoryThreadStore::new();
        let id = store.create_thread(new_thread(1, 100)).await.unwrap();

        let row = store.find_by_game(1, 100).await.unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.status, ThreadStatus::Future);
        assert!(row.post_id.is_none());

        assert!(store.find_by_game(2, 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_applies_only_given_fields() {
        let store = InMemoryThreadStore::new();
        let id = store.create_thread(new_thread(1, 100)).await.unwrap();

        store
            .update_thread(
                id,
                ThreadUpdate {
                    status: Some(ThreadStatus::Posted),
                    post_id: Some("abc".into()),
                    title: None,
                },
            )
            .await
            .unwrap();

        let row = store.find_thread(id).await.unwrap().unwrap();
        assert_eq!(row.status, ThreadStatus::Posted);
        assert_eq!(row.post_id.as_deref(), Some("abc"));
        assert!(row.title.is_none());
    }

    #[tokio::test]
    async fn update_of_missing_row_errors() {
        let store = InMemoryThreadStore::new();
        match store.update_thread(42, ThreadUpdate::default()).await {
            Err(StorageError::RowNotFound { id }) => assert_eq!(id, 42),
            other => panic!("expected row-not-found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unfinished_listing_excludes_terminal_rows() {
        let store = InMemoryThreadStore::new();
        let open = store.create_thread(new_thread(1, 100)).await.unwrap();
        let done = store.create_thread(new_thread(1, 101)).await.unwrap();
        store
            .update_thread(
                done,
                ThreadUpdate {
                    status: Some(ThreadStatus::Over),
                    ..ThreadUpdate::default()
                },
            )
            .await
            .unwrap();

        let rows = store.list_unfinished(1).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, open);
    }

    #[tokio::test]
    async fn flags_and_timestamps_round_trip() {
        let store = InMemoryThreadStore::new();
        assert!(store.get_flag("k").await.unwrap().is_none());
        store.set_flag("k", "v").await.unwrap();
        assert_eq!(store.get_flag("k").await.unwrap().as_deref(), Some("v"));

        let at = Utc::now();
        store.set_timestamp("t", at).await.unwrap();
        assert_eq!(store.get_timestamp("t").await.unwrap(), Some(at));
    }
}
