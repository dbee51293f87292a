//! The pregame/gamechat lifecycle pass.
//!
//! Invoked by the host scheduler every few minutes. Each invocation is a
//! short-lived, independent execution: it reads persisted state, performs at
//! most the transitions the feed calls for, persists the result, and exits.
//! The scheduler guarantees invocations of this pass never overlap.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::config::SubredditConfig;
use crate::context::BotContext;
use crate::dao::thread_store::{GameThreadRecord, NewGameThread, ThreadStore, ThreadUpdate};
use crate::error::ServiceError;
use crate::feed::GameFeed;
use crate::feed::models::{GameStatus, Snapshot};
use crate::posting::{PostingClient, Submission, SuggestedSort};
use crate::render::{
    self, RenderError, Renderer, SELF_ID_TOKEN, TemplateKind, fill_self_id,
    replace_update_region,
};
use crate::state::{ThreadEvent, ThreadStatus};

use super::SnapshotCache;
use super::no_hitter_service::NO_HITTER_SPECIAL;

/// Counts of what one lifecycle pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// New games recorded as `Future` threads.
    pub discovered: usize,
    /// Pregame or gamechat threads submitted.
    pub posted: usize,
    /// Live threads whose update region was edited.
    pub updated: usize,
    /// Threads moved to a terminal state.
    pub closed: usize,
}

/// Run one lifecycle pass over every configured subreddit.
///
/// A failure in one subreddit or game never crosses to another: errors are
/// logged and the pass moves on.
pub async fn run_thread_pass(ctx: &BotContext, now: DateTime<Utc>) -> PassSummary {
    let mut cache = SnapshotCache::new(ctx.feed.clone());
    let mut summary = PassSummary::default();

    for sub in &ctx.config.subreddits {
        if let Err(err) = run_subreddit_pass(ctx, sub, now, &mut cache, &mut summary).await {
            error!(subreddit = %sub.name, error = %err, "subreddit pass aborted");
        }
    }

    summary
}

/// Discover today's games and step every unfinished thread for one subreddit.
async fn run_subreddit_pass(
    ctx: &BotContext,
    sub: &SubredditConfig,
    now: DateTime<Utc>,
    cache: &mut SnapshotCache,
    summary: &mut PassSummary,
) -> Result<(), ServiceError> {
    let today = now.with_timezone(&sub.timezone()).date_naive();
    let schedule = ctx.feed.schedule(today).await?;

    for game in &schedule {
        if let Some(code) = &sub.team_code {
            if !game.involves(code) {
                continue;
            }
        }

        if ctx.store.find_by_game(sub.id, game.game_pk).await?.is_none() {
            let post_at = game.starts_at - Duration::minutes(sub.gamechat.lead_minutes);
            ctx.store
                .create_thread(NewGameThread {
                    post_at,
                    starts_at: game.starts_at,
                    subreddit_id: sub.id,
                    game_pk: game.game_pk,
                    post_id: None,
                    title: None,
                    status: ThreadStatus::Future,
                    special: None,
                })
                .await?;
            summary.discovered += 1;
            info!(subreddit = %sub.name, game_pk = game.game_pk, "discovered game");
        }
    }

    for row in ctx.store.list_unfinished(sub.id).await? {
        // Monitor-created threads are fire-and-forget; the lifecycle never
        // edits them.
        if row.special.as_deref() == Some(NO_HITTER_SPECIAL) {
            continue;
        }

        match step_thread(ctx, sub, &row, now, cache, summary).await {
            Ok(()) => {}
            // A missing template will not fix itself by retrying the other
            // rows; give up on this subreddit and let the rest continue.
            Err(err @ ServiceError::Config(_)) => return Err(err),
            Err(err) => warn!(
                subreddit = %sub.name,
                game_pk = row.game_pk,
                error = %err,
                "thread step failed; will retry on the next invocation"
            ),
        }
    }

    Ok(())
}

/// Advance one thread by at most one transition.
async fn step_thread(
    ctx: &BotContext,
    sub: &SubredditConfig,
    row: &GameThreadRecord,
    now: DateTime<Utc>,
    cache: &mut SnapshotCache,
    summary: &mut PassSummary,
) -> Result<(), ServiceError> {
    match row.status {
        ThreadStatus::Future | ThreadStatus::Pregame => {
            prepare_thread(ctx, sub, row, now, cache, summary).await
        }
        ThreadStatus::Posted => update_posted(ctx, sub, row, cache, summary).await,
        ThreadStatus::External => {
            debug!(game_pk = row.game_pk, "skipping externally managed thread");
            Ok(())
        }
        ThreadStatus::Over | ThreadStatus::Postponed | ThreadStatus::Removed => Ok(()),
    }
}

/// Handle a thread that has not had its gamechat posted yet.
async fn prepare_thread(
    ctx: &BotContext,
    sub: &SubredditConfig,
    row: &GameThreadRecord,
    now: DateTime<Utc>,
    cache: &mut SnapshotCache,
    summary: &mut PassSummary,
) -> Result<(), ServiceError> {
    let snapshot = cache.get(row.game_pk).await?;

    if snapshot.status.is_postponed() {
        return mark_closed(ctx, row, ThreadEvent::GamePostponed, summary).await;
    }
    if let GameStatus::Unrecognized(raw) = &snapshot.status {
        warn!(game_pk = row.game_pk, status = %raw, "unrecognized game status; leaving thread alone");
        return Ok(());
    }

    if now >= row.post_at {
        return post_gamechat(ctx, sub, row, &snapshot, summary).await;
    }

    if row.status == ThreadStatus::Future
        && sub.pregame.enabled
        && now >= row.starts_at - Duration::minutes(sub.pregame.lead_minutes)
    {
        return post_pregame(ctx, sub, row, &snapshot, summary).await;
    }

    Ok(())
}

/// Submit the pregame thread.
async fn post_pregame(
    ctx: &BotContext,
    sub: &SubredditConfig,
    row: &GameThreadRecord,
    snapshot: &Snapshot,
    summary: &mut PassSummary,
) -> Result<(), ServiceError> {
    if row.post_id.is_some() {
        return Err(ServiceError::Invariant(format!(
            "thread {} already has a post id; refusing to submit a pregame",
            row.id
        )));
    }

    let template = required_template(sub, TemplateKind::Pregame)?;
    let rendered = Renderer::new(sub.timezone()).render(template, snapshot);

    let submission = ctx
        .posting
        .submit(&sub.account, &sub.name, &rendered.title, &rendered.body)
        .await?;

    let next = row.status.apply(ThreadEvent::PregamePosted)?;
    ctx.store
        .update_thread(
            row.id,
            ThreadUpdate {
                status: Some(next),
                post_id: Some(submission.id.clone()),
                title: Some(submission.title.clone()),
            },
        )
        .await?;
    summary.posted += 1;
    info!(subreddit = %sub.name, game_pk = row.game_pk, post_id = %submission.id, "posted pregame thread");

    if sub.gamechat.sticky {
        ctx.posting.set_sticky(&sub.account, &submission.id, true).await?;
    }
    if let Some(flair) = &sub.pregame.flair {
        ctx.posting.set_flair(&sub.account, &submission.id, flair).await?;
    }

    Ok(())
}

/// Submit the gamechat thread.
///
/// The status row is written immediately after the submission succeeds and
/// before any secondary action, so a crash mid-operation leaves the thread
/// marked `Posted` and a retried pass catches up instead of double-posting.
async fn post_gamechat(
    ctx: &BotContext,
    sub: &SubredditConfig,
    row: &GameThreadRecord,
    snapshot: &Snapshot,
    summary: &mut PassSummary,
) -> Result<(), ServiceError> {
    if row.status == ThreadStatus::Future && row.post_id.is_some() {
        return Err(ServiceError::Invariant(format!(
            "thread {} already has a post id; refusing to submit a gamechat",
            row.id
        )));
    }

    let template = required_template(sub, TemplateKind::Gamechat)?;
    let rendered = Renderer::new(sub.timezone()).render(template, snapshot);

    let submission = ctx
        .posting
        .submit(&sub.account, &sub.name, &rendered.title, &rendered.body)
        .await?;

    let next = row.status.apply(ThreadEvent::GamechatPosted)?;
    ctx.store
        .update_thread(
            row.id,
            ThreadUpdate {
                status: Some(next),
                post_id: Some(submission.id.clone()),
                title: Some(submission.title.clone()),
            },
        )
        .await?;
    summary.posted += 1;
    info!(subreddit = %sub.name, game_pk = row.game_pk, post_id = %submission.id, "posted gamechat thread");

    apply_gamechat_secondary_actions(ctx, sub, row.game_pk, &submission).await?;

    Ok(())
}

/// The secondary actions performed after a gamechat submission. Each one is
/// idempotent; `update_posted` re-runs the detectable ones when a crashed
/// invocation left them pending.
async fn apply_gamechat_secondary_actions(
    ctx: &BotContext,
    sub: &SubredditConfig,
    game_pk: i64,
    submission: &Submission,
) -> Result<(), ServiceError> {
    let body = html_escape::decode_html_entities(&submission.body).into_owned();
    if body.contains(SELF_ID_TOKEN) {
        let filled = fill_self_id(&body, &submission.id);
        ctx.posting.edit(&sub.account, &submission.id, &filled).await?;
    }

    ctx.store
        .set_flag(&crosslink_key(game_pk, &sub.name), &submission.id)
        .await?;

    if sub.gamechat.sticky {
        ctx.posting.set_sticky(&sub.account, &submission.id, true).await?;
    }
    ctx.posting
        .set_suggested_sort(&sub.account, &submission.id, SuggestedSort::New)
        .await?;
    if let Some(flair) = &sub.gamechat.flair {
        ctx.posting.set_flair(&sub.account, &submission.id, flair).await?;
    }

    Ok(())
}

/// Refresh a live gamechat: catch up pending secondary actions, re-render
/// the update region, and close the thread out once the feed says the game
/// is over.
async fn update_posted(
    ctx: &BotContext,
    sub: &SubredditConfig,
    row: &GameThreadRecord,
    cache: &mut SnapshotCache,
    summary: &mut PassSummary,
) -> Result<(), ServiceError> {
    let snapshot = cache.get(row.game_pk).await?;

    let Some(post_id) = row.post_id.clone() else {
        return Err(ServiceError::Invariant(format!(
            "thread {} is Posted without a post id",
            row.id
        )));
    };

    let submission = match ctx.posting.fetch(&sub.account, &post_id).await {
        Ok(submission) => submission,
        Err(crate::posting::PostingError::NotFound { .. }) => {
            warn!(
                game_pk = row.game_pk,
                post_id = %post_id,
                "submission missing on platform; leaving status unchanged"
            );
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let current = html_escape::decode_html_entities(&submission.body).into_owned();

    // Catch-up: a crash after submission may have left the self-link token
    // and the cross-reference flag behind. Both are detectable, so retries
    // converge without re-submitting.
    let mut body = current.clone();
    if body.contains(SELF_ID_TOKEN) {
        body = fill_self_id(&body, &post_id);
    }
    let crosslink = crosslink_key(row.game_pk, &sub.name);
    if ctx.store.get_flag(&crosslink).await?.is_none() {
        ctx.store.set_flag(&crosslink, &post_id).await?;
    }

    let template = required_template(sub, TemplateKind::GamechatUpdate)?;
    let region = Renderer::new(sub.timezone()).render(template, &snapshot).body;

    match replace_update_region(&body, &region) {
        Ok(next_body) => {
            if next_body != current {
                ctx.posting.edit(&sub.account, &post_id, &next_body).await?;
                summary.updated += 1;
            }
        }
        Err(RenderError::MissingMarkers) => {
            warn!(
                game_pk = row.game_pk,
                post_id = %post_id,
                "update region markers missing from body; skipping edit"
            );
        }
    }

    match &snapshot.status {
        GameStatus::Final => {
            close_gamechat(ctx, sub, row, &snapshot, ThreadEvent::GameFinished, &post_id, summary)
                .await
        }
        GameStatus::Postponed => {
            close_gamechat(ctx, sub, row, &snapshot, ThreadEvent::GamePostponed, &post_id, summary)
                .await
        }
        GameStatus::Unrecognized(raw) => {
            warn!(game_pk = row.game_pk, status = %raw, "unrecognized game status; leaving thread open");
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Close a live gamechat and trigger the postgame thread.
async fn close_gamechat(
    ctx: &BotContext,
    sub: &SubredditConfig,
    row: &GameThreadRecord,
    snapshot: &Snapshot,
    event: ThreadEvent,
    post_id: &str,
    summary: &mut PassSummary,
) -> Result<(), ServiceError> {
    let next = row.status.apply(event)?;
    ctx.store
        .update_thread(
            row.id,
            ThreadUpdate {
                status: Some(next),
                ..ThreadUpdate::default()
            },
        )
        .await?;
    summary.closed += 1;
    info!(subreddit = %sub.name, game_pk = row.game_pk, status = %next, "closed gamechat thread");

    if sub.gamechat.sticky {
        ctx.posting.set_sticky(&sub.account, post_id, false).await?;
    }

    if sub.postgame.enabled {
        post_postgame(ctx, sub, snapshot).await?;
    }

    Ok(())
}

/// Submit the postgame thread. Not tracked by the lifecycle row.
async fn post_postgame(
    ctx: &BotContext,
    sub: &SubredditConfig,
    snapshot: &Snapshot,
) -> Result<(), ServiceError> {
    let template = required_template(sub, TemplateKind::Postgame)?;
    let rendered = Renderer::new(sub.timezone()).render(template, snapshot);

    let submission = ctx
        .posting
        .submit(&sub.account, &sub.name, &rendered.title, &rendered.body)
        .await?;
    info!(subreddit = %sub.name, game_pk = snapshot.game_pk, post_id = %submission.id, "posted postgame thread");

    if sub.gamechat.sticky {
        ctx.posting.set_sticky(&sub.account, &submission.id, true).await?;
    }
    if let Some(flair) = &sub.postgame.flair {
        ctx.posting.set_flair(&sub.account, &submission.id, flair).await?;
    }

    Ok(())
}

/// Mark a thread that never went live as postponed or removed.
async fn mark_closed(
    ctx: &BotContext,
    row: &GameThreadRecord,
    event: ThreadEvent,
    summary: &mut PassSummary,
) -> Result<(), ServiceError> {
    let next = row.status.apply(event)?;
    ctx.store
        .update_thread(
            row.id,
            ThreadUpdate {
                status: Some(next),
                ..ThreadUpdate::default()
            },
        )
        .await?;
    summary.closed += 1;
    info!(game_pk = row.game_pk, status = %next, "thread closed before going live");
    Ok(())
}

fn required_template(
    sub: &SubredditConfig,
    kind: TemplateKind,
) -> Result<&render::Template, ServiceError> {
    sub.template(kind).ok_or_else(|| {
        ServiceError::Config(format!("/r/{} has no {kind} template", sub.name))
    })
}

/// Store key cross-referencing a game's gamechat post per subreddit, so
/// other tooling can link to the live thread.
fn crosslink_key(game_pk: i64, subreddit: &str) -> String {
    format!("gamechat:{game_pk}:{subreddit}")
}
