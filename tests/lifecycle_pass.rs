//! End-to-end pass over the in-memory backends: one game's full day, from
//! discovery through the postgame thread, plus the no-hitter monitor
//! running against the same feed.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use dugout_bot::config::AppConfig;
use dugout_bot::context::BotContext;
use dugout_bot::dao::memory::InMemoryThreadStore;
use dugout_bot::dao::thread_store::ThreadStore;
use dugout_bot::feed::fixture::FixtureFeed;
use dugout_bot::feed::models::{GameStatus, InningHalf, InningLine, ScheduledGame, Snapshot};
use dugout_bot::posting::dry_run::DryRunPostingClient;
use dugout_bot::render::{UPDATE_REGION_END, UPDATE_REGION_START};
use dugout_bot::services::no_hitter_service::run_no_hitter_pass;
use dugout_bot::services::thread_service::run_thread_pass;
use dugout_bot::state::ThreadStatus;

const GAME_PK: i64 = 776100;
const SUBREDDIT_ID: i64 = 15;

fn config() -> AppConfig {
    AppConfig::from_json(&format!(
        r#"{{
            "subreddits": [{{
                "id": {SUBREDDIT_ID},
                "name": "mariners",
                "account": "MarinersBot",
                "team": "SEA",
                "timezone": "America/Los_Angeles",
                "pregame": {{"enabled": true, "lead_minutes": 240}},
                "postgame": {{"enabled": true}},
                "templates": {{
                    "pregame": {{"title": "Pregame Thread: %{{away_name}} @ %{{home_name}} - %B %-d", "body": "First pitch at %{{start_time}} / %{{start_time_et}} ET."}},
                    "gamechat": {{"title": "Game Thread: %{{away_name}} (%{{away_record}}) @ %{{home_name}} (%{{home_record}})", "body": "{start}\n\n%{{line_score}}\n\n{end}\n\nDiscuss."}},
                    "gamechat_update": {{"title": "", "body": "%{{line_score}}\n\n**Status:** %{{line_score_status}}"}},
                    "postgame": {{"title": "Postgame Thread: %{{away_name}} @ %{{home_name}}", "body": "Final score %{{away_runs}}-%{{home_runs}}."}},
                    "no_hitter": {{"title": "No Hitter Alert - %{{pitcher_names}} (%{{pitching_team}})", "body": "%{{line_score}}"}}
                }}
            }}],
            "no_hitter": {{"subreddit": "mariners", "min_innings": 2}}
        }}"#,
        start = UPDATE_REGION_START,
        end = UPDATE_REGION_END,
    ))
    .unwrap()
}

struct World {
    ctx: BotContext,
    feed: Arc<FixtureFeed>,
    posting: Arc<DryRunPostingClient>,
    store: Arc<InMemoryThreadStore>,
}

fn world() -> World {
    let feed = Arc::new(FixtureFeed::new());
    let posting = Arc::new(DryRunPostingClient::new());
    let store = Arc::new(InMemoryThreadStore::new());
    let ctx = BotContext::new(feed.clone(), posting.clone(), store.clone(), config());
    World {
        ctx,
        feed,
        posting,
        store,
    }
}

fn first_pitch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 7, 2, 10, 0).unwrap()
}

fn preview() -> Snapshot {
    let mut snapshot = Snapshot::empty(GAME_PK);
    snapshot.status = GameStatus::Preview;
    snapshot.detailed_state = Some("Scheduled".into());
    snapshot.home.name = Some("Mariners".into());
    snapshot.home.location = Some("Seattle".into());
    snapshot.home.abbreviation = Some("SEA".into());
    snapshot.home.probable_pitcher = Some("Logan Gilbert".into());
    snapshot.away.name = Some("Athletics".into());
    snapshot.away.abbreviation = Some("ATH".into());
    snapshot.starts_at = Some(first_pitch());
    snapshot
}

fn install(world: &World, snapshot: Snapshot) {
    world.feed.insert(
        ScheduledGame {
            game_pk: GAME_PK,
            starts_at: first_pitch(),
            home_abbreviation: Some("SEA".into()),
            away_abbreviation: Some("ATH".into()),
        },
        snapshot,
    );
}

async fn row(world: &World) -> dugout_bot::dao::thread_store::GameThreadRecord {
    world
        .store
        .find_by_game(SUBREDDIT_ID, GAME_PK)
        .await
        .unwrap()
        .expect("thread row exists")
}

#[tokio::test]
async fn full_game_day_from_discovery_to_postgame() {
    let world = world();
    install(&world, preview());

    // Early morning: game discovered, nothing posted yet.
    run_thread_pass(&world.ctx, first_pitch() - Duration::hours(9)).await;
    let record = row(&world).await;
    assert_eq!(record.status, ThreadStatus::Future);
    assert!(record.post_id.is_none());

    // Inside the pregame window.
    run_thread_pass(&world.ctx, first_pitch() - Duration::hours(3)).await;
    let record = row(&world).await;
    assert_eq!(record.status, ThreadStatus::Pregame);
    let pregame_id = record.post_id.clone().expect("pregame post id");
    let pregame = world.posting.submission(&pregame_id).unwrap();
    assert!(pregame.title.contains("Athletics"));
    assert!(pregame.title.contains("Mariners"));
    assert!(pregame.body.contains("ET."));

    // Inside the gamechat window: the same row flips to Posted and the post
    // id now points at the gamechat.
    run_thread_pass(&world.ctx, first_pitch() - Duration::minutes(30)).await;
    let record = row(&world).await;
    assert_eq!(record.status, ThreadStatus::Posted);
    let gamechat_id = record.post_id.clone().expect("gamechat post id");
    assert_ne!(gamechat_id, pregame_id);

    // Mid-game update: only the machine region changes.
    let mut live = preview();
    live.status = GameStatus::Live;
    live.detailed_state = Some("In Progress".into());
    live.current_inning = Some(5);
    live.inning_half = Some(InningHalf::Bottom);
    live.outs = Some(2);
    live.home.line = dugout_bot::feed::models::TeamLine {
        runs: Some(2),
        hits: Some(6),
        errors: Some(0),
    };
    live.away.line = dugout_bot::feed::models::TeamLine {
        runs: Some(1),
        hits: Some(4),
        errors: Some(1),
    };
    live.innings = (1..=5)
        .map(|num| InningLine {
            num,
            away_runs: Some(if num == 2 { 1 } else { 0 }),
            home_runs: Some(if num == 4 { 2 } else { 0 }),
        })
        .collect();
    world.feed.set_snapshot(live.clone());

    run_thread_pass(&world.ctx, first_pitch() + Duration::hours(1)).await;
    let body = world.posting.submission(&gamechat_id).unwrap().body;
    assert!(body.contains("Bottom of the 5th, 2 Outs"));
    assert!(body.contains("Discuss."), "human-authored text preserved");

    // Final: terminal status, unchanged post id, postgame thread appears.
    let mut done = live.clone();
    done.status = GameStatus::Final;
    done.detailed_state = Some("Final".into());
    world.feed.set_snapshot(done);

    run_thread_pass(&world.ctx, first_pitch() + Duration::hours(3)).await;
    let record = row(&world).await;
    assert_eq!(record.status, ThreadStatus::Over);
    assert_eq!(record.post_id.as_deref(), Some(gamechat_id.as_str()));

    let postgame = world
        .posting
        .submissions()
        .into_iter()
        .find(|submission| submission.title.starts_with("Postgame"))
        .expect("postgame posted");
    assert!(postgame.body.contains("1-2"));

    // Nothing left to do: one more pass changes nothing.
    let before = world.posting.submissions();
    run_thread_pass(&world.ctx, first_pitch() + Duration::hours(4)).await;
    assert_eq!(world.posting.submissions(), before);
}

#[tokio::test]
async fn monitor_posts_once_while_lifecycle_runs_alongside() {
    let world = world();
    let mut hitless = preview();
    hitless.status = GameStatus::Live;
    hitless.detailed_state = Some("In Progress".into());
    hitless.current_inning = Some(6);
    hitless.inning_half = Some(InningHalf::Top);
    hitless.home.line.hits = Some(5);
    hitless.home.line.runs = Some(3);
    hitless.away.line.hits = Some(0);
    hitless.away.line.runs = Some(0);
    install(&world, hitless);

    let at = first_pitch() + Duration::hours(2);
    // The lifecycle pass posts the gamechat; the monitor pass posts the
    // no-hitter thread exactly once across repeated invocations.
    run_thread_pass(&world.ctx, at).await;
    let mut monitor_posts = 0;
    for round in 0..3i64 {
        let now = at + Duration::seconds(601 * (round + 1));
        monitor_posts += run_no_hitter_pass(&world.ctx, now).await.unwrap();
    }
    assert_eq!(monitor_posts, 1);

    let alert = world
        .posting
        .submissions()
        .into_iter()
        .find(|submission| submission.title.starts_with("No Hitter Alert"))
        .expect("no-hitter thread posted");
    assert_eq!(alert.title, "No Hitter Alert - Logan Gilbert (Mariners)");

    // The lifecycle row and the monitor row coexist for the same game.
    let rows = world.store.list_unfinished(SUBREDDIT_ID).await.unwrap();
    let specials: Vec<Option<String>> = rows.iter().map(|row| row.special.clone()).collect();
    assert!(specials.contains(&None));
    assert!(specials.contains(&Some("no_hitter".into())));
}
