use std::fmt;

use chrono::{DateTime, Utc};

/// Coarse game state derived from the feed's detailed status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameStatus {
    /// Scheduled but not yet close to first pitch.
    Preview,
    /// Teams are warming up; first pitch is imminent.
    Warmup,
    /// The game is in progress.
    Live,
    /// The game is over.
    Final,
    /// The game was postponed.
    Postponed,
    /// A status string the state machine does not recognize. Carried verbatim
    /// so callers can log it; no transition is ever derived from it.
    Unrecognized(String),
}

impl GameStatus {
    /// Map a feed status string onto the coarse state.
    pub fn parse(detailed: &str) -> GameStatus {
        match detailed {
            "Preview" | "Scheduled" | "Pre-Game" => GameStatus::Preview,
            "Warmup" => GameStatus::Warmup,
            "In Progress" | "Manager Challenge" | "Delayed" => GameStatus::Live,
            "Final" | "Game Over" | "Completed Early" => GameStatus::Final,
            "Postponed" => GameStatus::Postponed,
            other => GameStatus::Unrecognized(other.to_owned()),
        }
    }

    /// Whether the game is currently being played.
    pub fn is_live(&self) -> bool {
        matches!(self, GameStatus::Live)
    }

    /// Whether the game has finished.
    pub fn is_final(&self) -> bool {
        matches!(self, GameStatus::Final)
    }

    /// Whether the game was postponed.
    pub fn is_postponed(&self) -> bool {
        matches!(self, GameStatus::Postponed)
    }
}

/// Which half of an inning the game is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InningHalf {
    /// Away team batting.
    Top,
    /// Between the top and bottom halves.
    Middle,
    /// Home team batting.
    Bottom,
    /// The inning is complete.
    End,
}

impl InningHalf {
    /// Parse the feed's half-inning label; unknown labels yield `None`.
    pub fn parse(value: &str) -> Option<InningHalf> {
        match value {
            "Top" => Some(InningHalf::Top),
            "Middle" => Some(InningHalf::Middle),
            "Bottom" => Some(InningHalf::Bottom),
            "End" => Some(InningHalf::End),
            _ => None,
        }
    }
}

impl fmt::Display for InningHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InningHalf::Top => "Top",
            InningHalf::Middle => "Middle",
            InningHalf::Bottom => "Bottom",
            InningHalf::End => "End",
        };
        f.write_str(name)
    }
}

/// One of the two sides of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamSide {
    /// The home team.
    Home,
    /// The away team.
    Away,
}

impl TeamSide {
    /// The other side.
    pub fn opponent(self) -> TeamSide {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }

    /// Lowercase label used in store keys.
    pub fn as_str(self) -> &'static str {
        match self {
            TeamSide::Home => "home",
            TeamSide::Away => "away",
        }
    }
}

/// A team's win-loss record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamRecord {
    /// Wins this season.
    pub wins: u32,
    /// Losses this season.
    pub losses: u32,
}

impl fmt::Display for TeamRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.wins, self.losses)
    }
}

/// Run/hit/error totals for one side. Fields stay `None` until the feed
/// reports a linescore for the side, which it does not before first pitch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamLine {
    /// Runs scored.
    pub runs: Option<u32>,
    /// Hits recorded.
    pub hits: Option<u32>,
    /// Errors committed.
    pub errors: Option<u32>,
}

/// Everything the feed knows about one side of a game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamSnapshot {
    /// Team nickname, e.g. "Mariners".
    pub name: Option<String>,
    /// Team location, e.g. "Seattle".
    pub location: Option<String>,
    /// Short code, e.g. "SEA".
    pub abbreviation: Option<String>,
    /// Current win-loss record.
    pub record: Option<TeamRecord>,
    /// Probable or current starting pitcher.
    pub probable_pitcher: Option<String>,
    /// Current run/hit/error line.
    pub line: TeamLine,
}

/// Per-inning run totals for the line score table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InningLine {
    /// 1-based inning number.
    pub num: u32,
    /// Away runs this inning, if the half has been played.
    pub away_runs: Option<u32>,
    /// Home runs this inning, if the half has been played.
    pub home_runs: Option<u32>,
}

/// A structured snapshot of one game's live state.
///
/// All optional fields have a documented fallback at render time (the `?`
/// placeholder); absence of a statistic must never block posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// External game identifier.
    pub game_pk: i64,
    /// Coarse status derived from the feed.
    pub status: GameStatus,
    /// The feed's verbatim detailed status, for display.
    pub detailed_state: Option<String>,
    /// Current inning; `None` until the game starts.
    pub current_inning: Option<u32>,
    /// Current half-inning; `None` until the game starts.
    pub inning_half: Option<InningHalf>,
    /// Outs in the current half-inning.
    pub outs: Option<u32>,
    /// Home side details.
    pub home: TeamSnapshot,
    /// Away side details.
    pub away: TeamSnapshot,
    /// Per-inning run lines, in inning order.
    pub innings: Vec<InningLine>,
    /// Feed's no-hitter flag. Not set before the sixth inning is complete.
    pub no_hitter: bool,
    /// Feed's perfect-game flag. Same availability as `no_hitter`.
    pub perfect_game: bool,
    /// Scheduled first pitch.
    pub starts_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// The requested side's details.
    pub fn team(&self, side: TeamSide) -> &TeamSnapshot {
        match side {
            TeamSide::Home => &self.home,
            TeamSide::Away => &self.away,
        }
    }

    /// A bare snapshot with nothing but the game identifier filled in.
    pub fn empty(game_pk: i64) -> Snapshot {
        Snapshot {
            game_pk,
            status: GameStatus::Preview,
            detailed_state: None,
            current_inning: None,
            inning_half: None,
            outs: None,
            home: TeamSnapshot::default(),
            away: TeamSnapshot::default(),
            innings: Vec::new(),
            no_hitter: false,
            perfect_game: false,
            starts_at: None,
        }
    }
}

/// One entry of a day's schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledGame {
    /// External game identifier.
    pub game_pk: i64,
    /// Scheduled first pitch.
    pub starts_at: DateTime<Utc>,
    /// Home team short code, when the schedule carries team data.
    pub home_abbreviation: Option<String>,
    /// Away team short code, when the schedule carries team data.
    pub away_abbreviation: Option<String>,
}

impl ScheduledGame {
    /// Whether either side matches the given team code.
    pub fn involves(&self, code: &str) -> bool {
        self.home_abbreviation.as_deref() == Some(code)
            || self.away_abbreviation.as_deref() == Some(code)
    }
}
