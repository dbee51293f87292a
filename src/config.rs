//! Application-level configuration loading: subreddits, templates, and
//! no-hitter monitor settings.

use std::collections::HashMap;
use std::{env, fs, io::ErrorKind, path::PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{info, warn};

use crate::render::{Template, TemplateKind};

/// Default location on disk where the bot looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/bot.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DUGOUT_BOT_CONFIG_PATH";
/// Zone used when a subreddit's configured timezone cannot be resolved.
const FALLBACK_TIMEZONE: Tz = chrono_tz::America::Los_Angeles;

/// Immutable runtime configuration shared across passes.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Subreddits the lifecycle pass manages.
    pub subreddits: Vec<SubredditConfig>,
    /// No-hitter monitor settings.
    pub no_hitter: NoHitterConfig,
}

/// One subreddit's settings and templates.
#[derive(Debug, Clone)]
pub struct SubredditConfig {
    /// Store identifier for the subreddit.
    pub id: i64,
    /// Subreddit name, without the `/r/` prefix.
    pub name: String,
    /// Posting account used for every action in this subreddit.
    pub account: String,
    /// Followed team's short code; `None` posts threads for every game.
    pub team_code: Option<String>,
    /// Gamechat thread options.
    pub gamechat: GamechatOptions,
    /// Pregame thread options.
    pub pregame: PregameOptions,
    /// Postgame thread options.
    pub postgame: PostgameOptions,
    timezone: Tz,
    templates: HashMap<String, Template>,
}

impl SubredditConfig {
    /// The subreddit's zone for rendering local times.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The configured template for a kind, if present.
    pub fn template(&self, kind: TemplateKind) -> Option<&Template> {
        self.templates.get(kind.as_str())
    }
}

/// Options for the primary gamechat thread.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GamechatOptions {
    /// Whether gamechats are stickied while live (and unstickied on close).
    pub sticky: bool,
    /// Flair template applied after posting.
    pub flair: Option<String>,
    /// Minutes before first pitch the gamechat goes live.
    pub lead_minutes: i64,
}

impl Default for GamechatOptions {
    fn default() -> Self {
        Self {
            sticky: true,
            flair: None,
            lead_minutes: 60,
        }
    }
}

/// Options for the optional pregame thread.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PregameOptions {
    /// Whether pregame threads are posted at all.
    pub enabled: bool,
    /// Flair template applied after posting.
    pub flair: Option<String>,
    /// Minutes before first pitch the pregame thread goes live.
    pub lead_minutes: i64,
}

impl Default for PregameOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            flair: None,
            lead_minutes: 240,
        }
    }
}

/// Options for the optional postgame thread.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostgameOptions {
    /// Whether postgame threads are posted when a gamechat closes.
    pub enabled: bool,
    /// Flair template applied after posting.
    pub flair: Option<String>,
}

/// Settings for the no-hitter monitor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NoHitterConfig {
    /// Name of the subreddit no-hitter threads are posted to.
    pub subreddit: String,
    /// Inning a side must stay hitless through before a thread is posted.
    pub min_innings: u32,
    /// Default seconds between monitor checks when no game is close to the
    /// threshold.
    pub recheck_secs: i64,
}

impl Default for NoHitterConfig {
    fn default() -> Self {
        Self {
            subreddit: "baseball".into(),
            min_innings: 2,
            recheck_secs: 600,
        }
    }
}

impl AppConfig {
    /// Load the configuration from disk, falling back to an empty default
    /// when the file is missing or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        subreddits = config.subreddits.len(),
                        "loaded bot configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration from its JSON representation.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Look up a subreddit's settings by name.
    pub fn subreddit(&self, name: &str) -> Option<&SubredditConfig> {
        self.subreddits.iter().find(|sub| sub.name == name)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            subreddits: Vec::new(),
            no_hitter: NoHitterConfig::default(),
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    subreddits: Vec<RawSubreddit>,
    #[serde(default)]
    no_hitter: NoHitterConfig,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            subreddits: value.subreddits.into_iter().map(Into::into).collect(),
            no_hitter: value.no_hitter,
        }
    }
}

/// JSON representation of one subreddit entry.
#[derive(Debug, Deserialize)]
struct RawSubreddit {
    id: i64,
    name: String,
    account: String,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    gamechat: GamechatOptions,
    #[serde(default)]
    pregame: PregameOptions,
    #[serde(default)]
    postgame: PostgameOptions,
    #[serde(default)]
    templates: HashMap<String, RawTemplate>,
}

/// JSON representation of one template pair.
#[derive(Debug, Deserialize)]
struct RawTemplate {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
}

impl From<RawSubreddit> for SubredditConfig {
    fn from(value: RawSubreddit) -> Self {
        let timezone = resolve_timezone(&value.name, value.timezone.as_deref());
        let templates = value
            .templates
            .into_iter()
            .map(|(kind, raw)| {
                (
                    kind,
                    Template {
                        title: raw.title,
                        body: raw.body,
                    },
                )
            })
            .collect();

        Self {
            id: value.id,
            name: value.name,
            account: value.account,
            team_code: value.team,
            gamechat: value.gamechat,
            pregame: value.pregame,
            postgame: value.postgame,
            timezone,
            templates,
        }
    }
}

/// Resolve a subreddit's zone, warning and falling back when the configured
/// name is not a valid IANA identifier.
fn resolve_timezone(subreddit: &str, configured: Option<&str>) -> Tz {
    let Some(name) = configured else {
        return FALLBACK_TIMEZONE;
    };

    match name.parse::<Tz>() {
        Ok(zone) => zone,
        Err(_) => {
            warn!(
                subreddit,
                timezone = name,
                "invalid timezone identifier; falling back to default"
            );
            FALLBACK_TIMEZONE
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
