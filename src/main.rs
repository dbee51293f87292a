//! Binary entrypoint: one subcommand per externally-scheduled pass.
//!
//! The host scheduler (cron or equivalent) invokes each pass on a fixed
//! cadence and must not overlap invocations of the same pass; the passes
//! themselves are short-lived and exit once persisted state is up to date.

use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dugout_bot::config::AppConfig;
use dugout_bot::context::BotContext;
use dugout_bot::dao::memory::InMemoryThreadStore;
use dugout_bot::feed::GameFeed;
use dugout_bot::posting::dry_run::DryRunPostingClient;
use dugout_bot::services::{no_hitter_service, thread_service};

#[derive(Parser)]
#[command(name = "dugout-bot", version, about = "Game thread bot passes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pregame/gamechat lifecycle pass.
    Gamechats,
    /// Run one no-hitter monitor pass.
    NoHitters,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load();
    let ctx = BotContext::new(
        build_feed()?,
        // Production posting and store adapters are wired by the deployment;
        // the stock binary records what it would do.
        Arc::new(DryRunPostingClient::new()),
        Arc::new(InMemoryThreadStore::new()),
        config,
    );

    match cli.command {
        Commands::Gamechats => {
            let summary = thread_service::run_thread_pass(&ctx, Utc::now()).await;
            info!(
                discovered = summary.discovered,
                posted = summary.posted,
                updated = summary.updated,
                closed = summary.closed,
                "lifecycle pass complete"
            );
        }
        Commands::NoHitters => {
            let posted = no_hitter_service::run_no_hitter_pass(&ctx, Utc::now()).await?;
            info!(posted, "no-hitter pass complete");
        }
    }

    Ok(())
}

#[cfg(feature = "statsapi")]
fn build_feed() -> anyhow::Result<Arc<dyn GameFeed>> {
    use anyhow::Context;

    use dugout_bot::feed::statsapi::StatsApiFeed;

    Ok(Arc::new(StatsApiFeed::new().context("building StatsAPI feed")?))
}

#[cfg(not(feature = "statsapi"))]
fn build_feed() -> anyhow::Result<Arc<dyn GameFeed>> {
    use dugout_bot::feed::fixture::FixtureFeed;

    Ok(Arc::new(FixtureFeed::new()))
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
