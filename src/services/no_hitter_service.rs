//! The no-hitter monitor pass.
//!
//! Scans all of today's games for a side that is still hitless deep into
//! the game, posting at most one thread per `(game, side)` ever. Between
//! qualifying windows the pass backs itself off through a store timestamp:
//! checks are expensive and the event is rare, so the re-check delay shrinks
//! as a hitless game approaches the posting threshold.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::SubredditConfig;
use crate::context::BotContext;
use crate::dao::thread_store::{NewGameThread, ThreadStore};
use crate::error::ServiceError;
use crate::feed::GameFeed;
use crate::feed::models::{InningHalf, Snapshot, TeamSide};
use crate::posting::{PostingClient, SuggestedSort};
use crate::render::{Renderer, TemplateKind};
use crate::state::ThreadStatus;

use super::SnapshotCache;

/// Store key holding the earliest time the next check may run.
pub const NEXT_CHECK_KEY: &str = "no_hitter:next_check";
/// `special` tag on thread rows created by this monitor.
pub const NO_HITTER_SPECIAL: &str = "no_hitter";

/// The feed's no-hitter and perfect-game flags are only set once this many
/// innings are complete, so they can only gate thresholds at least that deep.
const FLAG_AVAILABLE_MIN_INNINGS: u32 = 6;

/// Re-check delays in seconds, indexed by inning from the end: the closer a
/// hitless game gets to the posting threshold, the sooner we look again.
const BACKOFF_SECS: [i64; 7] = [0, 3600, 3600, 1800, 1200, 600, 30];

/// The delay before re-checking a hitless game in the given inning, for a
/// configured minimum-innings threshold. Non-increasing as the inning
/// approaches the threshold.
pub fn backoff_delay(min_innings: u32, inning: u32) -> Duration {
    let window = (min_innings as usize + 1).min(BACKOFF_SECS.len());
    let table = &BACKOFF_SECS[BACKOFF_SECS.len() - window..];
    let index = (inning as usize).min(table.len() - 1);
    Duration::seconds(table[index])
}

/// Run one monitor pass. Returns the number of threads posted.
///
/// The pass exits immediately, with no side effects, while the persisted
/// `next_check` gate is still in the future; a proceeding pass always writes
/// a fresh gate before returning.
pub async fn run_no_hitter_pass(
    ctx: &BotContext,
    now: DateTime<Utc>,
) -> Result<usize, ServiceError> {
    if let Some(next_check) = ctx.store.get_timestamp(NEXT_CHECK_KEY).await? {
        if now < next_check {
            debug!(%next_check, "no-hitter check suppressed");
            return Ok(0);
        }
    }

    let monitor = &ctx.config.no_hitter;
    let sub = ctx.config.subreddit(&monitor.subreddit).ok_or_else(|| {
        ServiceError::Config(format!(
            "no-hitter subreddit `{}` is not configured",
            monitor.subreddit
        ))
    })?;

    let mut delays = vec![Duration::seconds(monitor.recheck_secs)];
    let today = now.with_timezone(&sub.timezone()).date_naive();
    let schedule = ctx.feed.schedule(today).await?;
    let mut cache = SnapshotCache::new(ctx.feed.clone());
    let mut posted = 0;

    for game in &schedule {
        match watch_game(ctx, sub, game.game_pk, now, &mut cache, &mut delays).await {
            Ok(count) => posted += count,
            Err(err) => {
                warn!(game_pk = game.game_pk, error = %err, "no-hitter check failed for game");
            }
        }
    }

    let next_check = now + delays.iter().min().copied().unwrap_or_else(Duration::zero);
    ctx.store.set_timestamp(NEXT_CHECK_KEY, next_check).await?;
    debug!(%next_check, posted, "no-hitter pass complete");

    Ok(posted)
}

/// Check both sides of one game.
async fn watch_game(
    ctx: &BotContext,
    sub: &SubredditConfig,
    game_pk: i64,
    now: DateTime<Utc>,
    cache: &mut SnapshotCache,
    delays: &mut Vec<Duration>,
) -> Result<usize, ServiceError> {
    let snapshot = cache.get(game_pk).await?;
    let monitor = &ctx.config.no_hitter;

    if monitor.min_innings >= FLAG_AVAILABLE_MIN_INNINGS
        && !(snapshot.no_hitter || snapshot.perfect_game)
    {
        return Ok(0);
    }

    // No inning reported means the game has not started.
    let Some(inning) = snapshot.current_inning else {
        return Ok(0);
    };
    let half = snapshot.inning_half;

    let mut posted = 0;
    for side in [TeamSide::Away, TeamSide::Home] {
        if watch_side(ctx, sub, &snapshot, side, inning, half, now, delays).await? {
            posted += 1;
        }
    }

    Ok(posted)
}

/// Check one batting side of one game, posting when it qualifies.
async fn watch_side(
    ctx: &BotContext,
    sub: &SubredditConfig,
    snapshot: &Snapshot,
    side: TeamSide,
    inning: u32,
    half: Option<InningHalf>,
    now: DateTime<Utc>,
    delays: &mut Vec<Duration>,
) -> Result<bool, ServiceError> {
    let key = dedup_key(snapshot.game_pk, side);
    if ctx.store.get_flag(&key).await?.is_some() {
        return Ok(false);
    }

    if snapshot.team(side).line.hits != Some(0) {
        return Ok(false);
    }

    let min_innings = ctx.config.no_hitter.min_innings;
    if !past_boundary(side, inning, half, min_innings) {
        if inning <= min_innings {
            delays.push(backoff_delay(min_innings, inning));
        }
        return Ok(false);
    }

    post_no_hitter_thread(ctx, sub, snapshot, side, now, &key).await?;
    Ok(true)
}

/// Whether a side's hitless status can be confirmed yet.
///
/// A team's batting is complete only after its half-inning ends, so the
/// boundaries are asymmetric: the away side is confirmed once the top of the
/// threshold inning is over, the home side once the whole inning is.
fn past_boundary(side: TeamSide, inning: u32, half: Option<InningHalf>, min_innings: u32) -> bool {
    match side {
        TeamSide::Away => {
            inning > min_innings || (inning == min_innings && half != Some(InningHalf::Top))
        }
        TeamSide::Home => {
            inning > min_innings || (inning == min_innings && half == Some(InningHalf::End))
        }
    }
}

/// Submit the no-hitter thread and record the dedup flag.
async fn post_no_hitter_thread(
    ctx: &BotContext,
    sub: &SubredditConfig,
    snapshot: &Snapshot,
    side: TeamSide,
    now: DateTime<Utc>,
    dedup_key: &str,
) -> Result<(), ServiceError> {
    let template = sub.template(TemplateKind::NoHitter).ok_or_else(|| {
        ServiceError::Config(format!("/r/{} has no no_hitter template", sub.name))
    })?;
    let rendered = Renderer::new(sub.timezone()).render_no_hitter(template, snapshot, side);

    let submission = ctx
        .posting
        .submit(&sub.account, &sub.name, &rendered.title, &rendered.body)
        .await?;

    ctx.store
        .create_thread(NewGameThread {
            post_at: now,
            starts_at: snapshot.starts_at.unwrap_or(now),
            subreddit_id: sub.id,
            game_pk: snapshot.game_pk,
            post_id: Some(submission.id.clone()),
            title: Some(submission.title.clone()),
            status: ThreadStatus::Posted,
            special: Some(NO_HITTER_SPECIAL.to_owned()),
        })
        .await?;

    ctx.posting
        .set_suggested_sort(&sub.account, &submission.id, SuggestedSort::New)
        .await?;

    ctx.store.set_flag(dedup_key, &submission.id).await?;

    info!(
        subreddit = %sub.name,
        game_pk = snapshot.game_pk,
        side = side.as_str(),
        post_id = %submission.id,
        "posted no-hitter thread"
    );

    Ok(())
}

/// Store key marking that a thread was posted for this game and side.
fn dedup_key(game_pk: i64, side: TeamSide) -> String {
    format!("no_hitters:{game_pk}:{}", side.as_str())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use crate::config::AppConfig;
    use crate::dao::memory::InMemoryThreadStore;
    use crate::dao::thread_store::ThreadStore;
    use crate::feed::fixture::FixtureFeed;
    use crate::feed::models::{GameStatus, ScheduledGame};
    use crate::posting::dry_run::DryRunPostingClient;

    use super::*;

    const GAME_PK: i64 = 776002;

    fn config(min_innings: u32) -> AppConfig {
        AppConfig::from_json(&format!(
            r#"{{
                "subreddits": [{{
                    "id": 2,
                    "name": "baseball",
                    "account": "BaseballBot",
                    "timezone": "America/New_York",
                    "templates": {{
                        "no_hitter": {{
                            "title": "No Hitter Alert - %{{pitcher_names}} (%{{pitching_team}})",
                            "body": "%{{pitching_team}} pitching has held %{{no_hit_team}} hitless.\n\n%{{line_score}}"
                        }}
                    }}
                }}],
                "no_hitter": {{"subreddit": "baseball", "min_innings": {min_innings}}}
            }}"#
        ))
        .unwrap()
    }

    struct Harness {
        ctx: BotContext,
        feed: Arc<FixtureFeed>,
        posting: Arc<DryRunPostingClient>,
        store: Arc<InMemoryThreadStore>,
    }

    fn harness(config: AppConfig) -> Harness {
        let feed = Arc::new(FixtureFeed::new());
        let posting = Arc::new(DryRunPostingClient::new());
        let store = Arc::new(InMemoryThreadStore::new());
        let ctx = BotContext::new(feed.clone(), posting.clone(), store.clone(), config);
        Harness {
            ctx,
            feed,
            posting,
            store,
        }
    }

    fn live_snapshot(inning: u32, half: InningHalf, away_hits: u32, home_hits: u32) -> Snapshot {
        let mut snapshot = Snapshot::empty(GAME_PK);
        snapshot.status = GameStatus::Live;
        snapshot.detailed_state = Some("In Progress".into());
        snapshot.current_inning = Some(inning);
        snapshot.inning_half = Some(half);
        snapshot.home.name = Some("Mariners".into());
        snapshot.home.abbreviation = Some("SEA".into());
        snapshot.home.probable_pitcher = Some("Logan Gilbert".into());
        snapshot.away.name = Some("Athletics".into());
        snapshot.away.abbreviation = Some("ATH".into());
        snapshot.away.probable_pitcher = Some("JP Sears".into());
        snapshot.home.line.hits = Some(home_hits);
        snapshot.home.line.runs = Some(0);
        snapshot.away.line.hits = Some(away_hits);
        snapshot.away.line.runs = Some(0);
        snapshot.starts_at = Some(Utc.with_ymd_and_hms(2026, 8, 6, 23, 10, 0).unwrap());
        snapshot
    }

    fn install(harness: &Harness, snapshot: Snapshot) {
        harness.feed.insert(
            ScheduledGame {
                game_pk: GAME_PK,
                starts_at: snapshot.starts_at.unwrap(),
                home_abbreviation: Some("SEA".into()),
                away_abbreviation: Some("ATH".into()),
            },
            snapshot,
        );
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 1, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn repeated_passes_post_exactly_one_thread_per_side() {
        let harness = harness(config(2));
        // Both sides hitless past the boundary.
        install(&harness, live_snapshot(4, InningHalf::Top, 0, 0));

        let mut at = now();
        let mut total = 0;
        for _ in 0..5 {
            total += run_no_hitter_pass(&harness.ctx, at).await.unwrap();
            // Step past whatever gate the pass left behind.
            at += Duration::seconds(3600);
        }

        assert_eq!(total, 2);
        assert_eq!(harness.posting.submission_count(), 2);

        let away_flag = harness.store.get_flag(&dedup_key(GAME_PK, TeamSide::Away)).await.unwrap();
        let home_flag = harness.store.get_flag(&dedup_key(GAME_PK, TeamSide::Home)).await.unwrap();
        assert!(away_flag.is_some());
        assert!(home_flag.is_some());
    }

    #[tokio::test]
    async fn thread_carries_pitcher_and_pitching_team() {
        let harness = harness(config(2));
        // Only the away side is hitless: the home side's pitching staff gets
        // the credit.
        install(&harness, live_snapshot(5, InningHalf::Bottom, 0, 3));

        let posted = run_no_hitter_pass(&harness.ctx, now()).await.unwrap();
        assert_eq!(posted, 1);

        let submissions = harness.posting.submissions();
        let submission = &submissions[0];
        assert_eq!(submission.title, "No Hitter Alert - Logan Gilbert (Mariners)");
        assert!(submission.body.contains("held Athletics hitless"));
        assert_eq!(
            harness.posting.suggested_sort(&submission.id),
            Some(SuggestedSort::New)
        );

        let row = harness.store.find_by_game(2, GAME_PK).await.unwrap().unwrap();
        assert_eq!(row.status, ThreadStatus::Posted);
        assert_eq!(row.special.as_deref(), Some(NO_HITTER_SPECIAL));
        assert_eq!(row.post_id.as_deref(), Some(submission.id.as_str()));
    }

    #[tokio::test]
    async fn gate_suppresses_early_reentry() {
        let harness = harness(config(2));
        install(&harness, live_snapshot(1, InningHalf::Top, 0, 2));

        let first = now();
        run_no_hitter_pass(&harness.ctx, first).await.unwrap();
        let gate = harness.store.get_timestamp(NEXT_CHECK_KEY).await.unwrap().unwrap();
        assert!(gate > first);

        // Re-entry before the gate: no side effects, gate untouched.
        run_no_hitter_pass(&harness.ctx, first + Duration::seconds(1)).await.unwrap();
        assert_eq!(
            harness.store.get_timestamp(NEXT_CHECK_KEY).await.unwrap(),
            Some(gate)
        );
        assert_eq!(harness.posting.submission_count(), 0);
    }

    #[tokio::test]
    async fn near_threshold_game_shrinks_the_gate() {
        let harness = harness(config(2));
        // Away side hitless at the top of the threshold inning: not yet
        // confirmable, so the pass asks to look again in 30 seconds instead
        // of the 600-second default.
        install(&harness, live_snapshot(2, InningHalf::Top, 0, 2));

        let at = now();
        let posted = run_no_hitter_pass(&harness.ctx, at).await.unwrap();
        assert_eq!(posted, 0);

        let gate = harness.store.get_timestamp(NEXT_CHECK_KEY).await.unwrap().unwrap();
        assert_eq!(gate, at + Duration::seconds(30));
    }

    #[tokio::test]
    async fn unstarted_and_hitting_games_are_skipped() {
        let harness = harness(config(2));
        let mut unstarted = live_snapshot(4, InningHalf::Top, 0, 0);
        unstarted.current_inning = None;
        unstarted.inning_half = None;
        install(&harness, unstarted);

        assert_eq!(run_no_hitter_pass(&harness.ctx, now()).await.unwrap(), 0);

        // Both sides have hits now.
        install(&harness, live_snapshot(7, InningHalf::Bottom, 4, 6));
        let at = now() + Duration::seconds(3600);
        assert_eq!(run_no_hitter_pass(&harness.ctx, at).await.unwrap(), 0);
        assert_eq!(harness.posting.submission_count(), 0);
    }

    #[tokio::test]
    async fn high_threshold_requires_the_feed_flag() {
        let harness = harness(config(6));
        // Hitless through seven but the feed flag is not set.
        install(&harness, live_snapshot(7, InningHalf::Bottom, 0, 2));
        assert_eq!(run_no_hitter_pass(&harness.ctx, now()).await.unwrap(), 0);

        let mut flagged = live_snapshot(7, InningHalf::Bottom, 0, 2);
        flagged.no_hitter = true;
        install(&harness, flagged);
        let at = now() + Duration::seconds(3600);
        assert_eq!(run_no_hitter_pass(&harness.ctx, at).await.unwrap(), 1);
    }

    #[test]
    fn away_boundary_matches_spec_scenario() {
        // min_innings = 2: qualifies at (2, Bottom) or any inning > 2, not
        // at (2, Top).
        assert!(past_boundary(TeamSide::Away, 2, Some(InningHalf::Bottom), 2));
        assert!(past_boundary(TeamSide::Away, 2, Some(InningHalf::Middle), 2));
        assert!(past_boundary(TeamSide::Away, 3, Some(InningHalf::Top), 2));
        assert!(!past_boundary(TeamSide::Away, 2, Some(InningHalf::Top), 2));
        assert!(!past_boundary(TeamSide::Away, 1, Some(InningHalf::End), 2));
    }

    #[test]
    fn home_boundary_matches_spec_scenario() {
        // min_innings = 2: qualifies at (2, End) or any inning > 2, not at
        // (2, Middle).
        assert!(past_boundary(TeamSide::Home, 2, Some(InningHalf::End), 2));
        assert!(past_boundary(TeamSide::Home, 3, Some(InningHalf::Top), 2));
        assert!(!past_boundary(TeamSide::Home, 2, Some(InningHalf::Middle), 2));
        assert!(!past_boundary(TeamSide::Home, 2, Some(InningHalf::Bottom), 2));
    }

    #[test]
    fn backoff_is_non_increasing_up_to_the_threshold() {
        for min_innings in [2u32, 4, 6] {
            let mut previous = Duration::MAX;
            for inning in 1..=min_innings {
                let delay = backoff_delay(min_innings, inning);
                assert!(
                    delay <= previous,
                    "delay grew at inning {inning} for threshold {min_innings}"
                );
                previous = delay;
            }
        }
    }

    #[test]
    fn backoff_shrinks_to_thirty_seconds_at_the_threshold() {
        assert_eq!(backoff_delay(2, 1), Duration::seconds(600));
        assert_eq!(backoff_delay(2, 2), Duration::seconds(30));
        assert_eq!(backoff_delay(6, 1), Duration::seconds(3600));
        assert_eq!(backoff_delay(6, 6), Duration::seconds(30));
    }
}
