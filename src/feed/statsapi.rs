use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use super::{
    FeedError, FeedResult, GameFeed,
    models::{
        GameStatus, InningHalf, InningLine, ScheduledGame, Snapshot, TeamLine, TeamRecord,
        TeamSnapshot,
    },
};

const DEFAULT_BASE_URL: &str = "https://statsapi.mlb.com";

/// Errors local to the StatsAPI transport.
#[derive(Debug, Error)]
pub enum StatsApiError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    ClientBuilder(#[source] reqwest::Error),
    /// A request failed before a response arrived.
    #[error("request to {path} failed")]
    Request {
        /// Request path relative to the base URL.
        path: String,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The API answered with a non-success status.
    #[error("unexpected status {status} from {path}")]
    Status {
        /// Request path relative to the base URL.
        path: String,
        /// Response status code.
        status: StatusCode,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response from {path}")]
    Decode {
        /// Request path relative to the base URL.
        path: String,
        /// Decode failure.
        #[source]
        source: reqwest::Error,
    },
}

/// Live game feed backed by the MLB StatsAPI.
#[derive(Clone)]
pub struct StatsApiFeed {
    client: Client,
    base_url: Arc<str>,
}

impl StatsApiFeed {
    /// Build a feed against the public StatsAPI endpoint.
    pub fn new() -> FeedResult<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Build a feed against a custom endpoint (used against test servers).
    pub fn with_base_url(base_url: &str) -> FeedResult<Self> {
        let client = Client::builder().build().map_err(|source| {
            FeedError::unavailable(
                "failed to build HTTP client".into(),
                StatsApiError::ClientBuilder(source),
            )
        })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    async fn get_json<T>(client: Client, base_url: Arc<str>, path: String) -> Result<T, StatsApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{base_url}{path}");
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|source| StatsApiError::Request {
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatsApiError::Status { path, status });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| StatsApiError::Decode { path, source })
    }
}

impl GameFeed for StatsApiFeed {
    fn schedule(&self, day: NaiveDate) -> BoxFuture<'static, FeedResult<Vec<ScheduledGame>>> {
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let path = format!(
            "/api/v1/schedule?sportId=1&hydrate=team&date={}",
            day.format("%m/%d/%Y")
        );

        Box::pin(async move {
            let payload: SchedulePayload = Self::get_json(client, base_url, path)
                .await
                .map_err(|err| FeedError::unavailable("schedule fetch failed".into(), err))?;

            let games = payload
                .dates
                .into_iter()
                .flat_map(|date| date.games)
                .filter_map(|game| {
                    let (home, away) = match game.teams {
                        Some(sides) => (sides.home, sides.away),
                        None => (None, None),
                    };
                    Some(ScheduledGame {
                        game_pk: game.game_pk?,
                        starts_at: game.game_date?,
                        home_abbreviation: home.and_then(|side| side.team?.abbreviation),
                        away_abbreviation: away.and_then(|side| side.team?.abbreviation),
                    })
                })
                .collect();

            Ok(games)
        })
    }

    fn fetch(&self, game_pk: i64) -> BoxFuture<'static, FeedResult<Snapshot>> {
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let path = format!("/api/v1.1/game/{game_pk}/feed/live");

        Box::pin(async move {
            let payload: LiveFeedPayload =
                Self::get_json(client, base_url, path).await.map_err(|err| match err {
                    StatsApiError::Status {
                        status: StatusCode::NOT_FOUND,
                        ..
                    } => FeedError::NotFound { game_pk },
                    other => FeedError::unavailable("live feed fetch failed".into(), other),
                })?;

            Ok(payload.into_snapshot(game_pk))
        })
    }
}

// Wire payloads. Every field is optional so a thin or in-flux response
// degrades to renderer placeholders instead of failing the whole pass.

#[derive(Debug, Deserialize)]
struct SchedulePayload {
    #[serde(default)]
    dates: Vec<ScheduleDatePayload>,
}

#[derive(Debug, Deserialize)]
struct ScheduleDatePayload {
    #[serde(default)]
    games: Vec<ScheduleGamePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleGamePayload {
    game_pk: Option<i64>,
    game_date: Option<DateTime<Utc>>,
    teams: Option<SidesPayload<ScheduleSidePayload>>,
}

#[derive(Debug, Deserialize)]
struct ScheduleSidePayload {
    team: Option<ScheduleTeamPayload>,
}

#[derive(Debug, Deserialize)]
struct ScheduleTeamPayload {
    abbreviation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveFeedPayload {
    game_data: Option<GameDataPayload>,
    live_data: Option<LiveDataPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameDataPayload {
    status: Option<StatusPayload>,
    teams: Option<SidesPayload<TeamPayload>>,
    datetime: Option<DatetimePayload>,
    probable_pitchers: Option<SidesPayload<PersonPayload>>,
    flags: Option<FlagsPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload {
    detailed_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SidesPayload<T> {
    home: Option<T>,
    away: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamPayload {
    team_name: Option<String>,
    location_name: Option<String>,
    abbreviation: Option<String>,
    record: Option<RecordPayload>,
}

#[derive(Debug, Deserialize)]
struct RecordPayload {
    wins: Option<u32>,
    losses: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonPayload {
    #[serde(alias = "boxscoreName")]
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatetimePayload {
    date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlagsPayload {
    #[serde(default)]
    no_hitter: bool,
    #[serde(default)]
    perfect_game: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveDataPayload {
    linescore: Option<LinescorePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinescorePayload {
    current_inning: Option<u32>,
    inning_half: Option<String>,
    outs: Option<u32>,
    #[serde(default)]
    innings: Vec<InningPayload>,
    teams: Option<SidesPayload<RhePayload>>,
}

#[derive(Debug, Deserialize)]
struct InningPayload {
    num: Option<u32>,
    home: Option<RhePayload>,
    away: Option<RhePayload>,
}

#[derive(Debug, Deserialize, Default)]
struct RhePayload {
    runs: Option<u32>,
    hits: Option<u32>,
    errors: Option<u32>,
}

impl From<RhePayload> for TeamLine {
    fn from(value: RhePayload) -> Self {
        TeamLine {
            runs: value.runs,
            hits: value.hits,
            errors: value.errors,
        }
    }
}

impl LiveFeedPayload {
    fn into_snapshot(self, game_pk: i64) -> Snapshot {
        let mut snapshot = Snapshot::empty(game_pk);

        if let Some(game_data) = self.game_data {
            if let Some(detailed) = game_data.status.and_then(|status| status.detailed_state) {
                snapshot.status = GameStatus::parse(&detailed);
                snapshot.detailed_state = Some(detailed);
            }

            let (home_team, away_team) = match game_data.teams {
                Some(sides) => (sides.home, sides.away),
                None => (None, None),
            };
            let (home_pitcher, away_pitcher) = match game_data.probable_pitchers {
                Some(sides) => (sides.home, sides.away),
                None => (None, None),
            };
            snapshot.home = build_team(home_team, home_pitcher);
            snapshot.away = build_team(away_team, away_pitcher);

            snapshot.starts_at = game_data.datetime.and_then(|datetime| datetime.date_time);

            if let Some(flags) = game_data.flags {
                snapshot.no_hitter = flags.no_hitter;
                snapshot.perfect_game = flags.perfect_game;
            }
        }

        if let Some(linescore) = self.live_data.and_then(|live| live.linescore) {
            snapshot.current_inning = linescore.current_inning;
            snapshot.inning_half = linescore
                .inning_half
                .as_deref()
                .and_then(InningHalf::parse);
            snapshot.outs = linescore.outs;

            if let Some(sides) = linescore.teams {
                snapshot.home.line = sides.home.unwrap_or_default().into();
                snapshot.away.line = sides.away.unwrap_or_default().into();
            }

            snapshot.innings = linescore
                .innings
                .into_iter()
                .filter_map(|inning| {
                    Some(InningLine {
                        num: inning.num?,
                        away_runs: inning.away.and_then(|side| side.runs),
                        home_runs: inning.home.and_then(|side| side.runs),
                    })
                })
                .collect();
        }

        snapshot
    }
}

fn build_team(team: Option<TeamPayload>, pitcher: Option<PersonPayload>) -> TeamSnapshot {
    let mut built = TeamSnapshot {
        probable_pitcher: pitcher.and_then(|person| person.full_name),
        ..TeamSnapshot::default()
    };

    if let Some(team) = team {
        built.name = team.team_name;
        built.location = team.location_name;
        built.abbreviation = team.abbreviation;
        built.record = team.record.and_then(|record| {
            Some(TeamRecord {
                wins: record.wins?,
                losses: record.losses?,
            })
        });
    }

    built
}
