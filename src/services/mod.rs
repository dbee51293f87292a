//! Pass orchestration services.

/// No-hitter monitor pass.
pub mod no_hitter_service;
/// Pregame/gamechat lifecycle pass.
pub mod thread_service;

use std::collections::HashMap;
use std::sync::Arc;

use crate::feed::{FeedResult, GameFeed, models::Snapshot};

/// Per-invocation snapshot memoization.
///
/// Avoids fetching the same game twice when several subreddits track it.
/// Never outlives its invocation: each pass builds a fresh cache so no feed
/// data is carried across scheduler ticks.
pub struct SnapshotCache {
    feed: Arc<dyn GameFeed>,
    snapshots: HashMap<i64, Snapshot>,
}

impl SnapshotCache {
    /// An empty cache reading through the given feed.
    pub fn new(feed: Arc<dyn GameFeed>) -> Self {
        Self {
            feed,
            snapshots: HashMap::new(),
        }
    }

    /// The snapshot for a game, fetched at most once per invocation.
    pub async fn get(&mut self, game_pk: i64) -> FeedResult<Snapshot> {
        if let Some(snapshot) = self.snapshots.get(&game_pk) {
            return Ok(snapshot.clone());
        }

        let snapshot = self.feed.fetch(game_pk).await?;
        self.snapshots.insert(game_pk, snapshot.clone());
        Ok(snapshot)
    }
}
