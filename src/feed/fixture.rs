use chrono::NaiveDate;
use dashmap::DashMap;
use futures::future::BoxFuture;

use super::{
    FeedError, FeedResult, GameFeed,
    models::{ScheduledGame, Snapshot},
};

/// In-memory feed serving canned snapshots.
///
/// Used by tests and by the binary's dry-run mode; the snapshot for a game
/// can be swapped between invocations to script a game's progression.
#[derive(Debug, Default)]
pub struct FixtureFeed {
    schedule: DashMap<i64, ScheduledGame>,
    snapshots: DashMap<i64, Snapshot>,
}

impl FixtureFeed {
    /// An empty fixture feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a game to the day's schedule and install its snapshot.
    pub fn insert(&self, game: ScheduledGame, snapshot: Snapshot) {
        self.schedule.insert(game.game_pk, game);
        self.snapshots.insert(snapshot.game_pk, snapshot);
    }

    /// Replace the snapshot served for a game.
    pub fn set_snapshot(&self, snapshot: Snapshot) {
        self.snapshots.insert(snapshot.game_pk, snapshot);
    }

    /// Add a game to the schedule without a snapshot, so fetches for it fail.
    pub fn schedule_only(&self, game: ScheduledGame) {
        self.schedule.insert(game.game_pk, game);
    }
}

impl GameFeed for FixtureFeed {
    fn schedule(&self, _day: NaiveDate) -> BoxFuture<'static, FeedResult<Vec<ScheduledGame>>> {
        let mut games: Vec<ScheduledGame> =
            self.schedule.iter().map(|entry| entry.value().clone()).collect();
        games.sort_by_key(|game| (game.starts_at, game.game_pk));
        Box::pin(async move { Ok(games) })
    }

    fn fetch(&self, game_pk: i64) -> BoxFuture<'static, FeedResult<Snapshot>> {
        let snapshot = self.snapshots.get(&game_pk).map(|entry| entry.value().clone());
        Box::pin(async move { snapshot.ok_or(FeedError::NotFound { game_pk }) })
    }
}
