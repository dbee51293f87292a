//! Explicit dependency bundle passed into every pass.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::dao::thread_store::ThreadStore;
use crate::feed::GameFeed;
use crate::posting::PostingClient;

/// Everything a pass needs: the three ports plus the loaded configuration.
///
/// Constructed once per process in `main` and passed by reference; no
/// component holds hidden global state.
#[derive(Clone)]
pub struct BotContext {
    /// Live game feed.
    pub feed: Arc<dyn GameFeed>,
    /// Posting platform.
    pub posting: Arc<dyn PostingClient>,
    /// Thread rows and the typed flag/timestamp surface.
    pub store: Arc<dyn ThreadStore>,
    /// Immutable runtime configuration.
    pub config: AppConfig,
}

impl BotContext {
    /// Bundle the given ports and configuration.
    pub fn new(
        feed: Arc<dyn GameFeed>,
        posting: Arc<dyn PostingClient>,
        store: Arc<dyn ThreadStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            feed,
            posting,
            store,
            config,
        }
    }
}
