use std::collections::HashMap;
use std::fmt::Display;
use std::sync::LazyLock;

use chrono_tz::Tz;
use regex::{Captures, Regex};

use crate::feed::models::{Snapshot, TeamSide, TeamSnapshot};

use super::line_score;

/// Placeholder substituted for any statistic the feed has not reported.
pub const PLACEHOLDER: &str = "?";

/// Zone used for the league-wide `start_time_et` token.
const EASTERN: Tz = chrono_tz::America::New_York;

/// Named token values for one snapshot.
pub type TokenTable = HashMap<&'static str, String>;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\{([a-z_]+)\}").expect("token pattern"));

/// Replace every `%{token}` in `pattern` with its table value.
///
/// Unknown token names are left verbatim so a template typo stays visible to
/// its author instead of silently disappearing.
pub fn substitute(pattern: &str, table: &TokenTable) -> String {
    TOKEN_RE
        .replace_all(pattern, |caps: &Captures<'_>| {
            table
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

/// Build the token table shared by every template kind.
pub fn token_table(snapshot: &Snapshot, timezone: Tz) -> TokenTable {
    let mut table = TokenTable::new();

    add_team_tokens(
        &mut table,
        &snapshot.home,
        [
            "home_name",
            "home_city",
            "home_code",
            "home_record",
            "home_pitcher",
            "home_runs",
            "home_hits",
            "home_errors",
        ],
    );
    add_team_tokens(
        &mut table,
        &snapshot.away,
        [
            "away_name",
            "away_city",
            "away_code",
            "away_record",
            "away_pitcher",
            "away_runs",
            "away_hits",
            "away_errors",
        ],
    );

    let start_local = snapshot
        .starts_at
        .map(|at| at.with_timezone(&timezone).format("%-I:%M %p").to_string());
    let start_eastern = snapshot
        .starts_at
        .map(|at| at.with_timezone(&EASTERN).format("%-I:%M %p").to_string());
    table.insert("start_time", opt(start_local));
    table.insert("start_time_et", opt(start_eastern));

    table.insert("line_score", line_score::line_score(snapshot));
    table.insert("line_score_status", line_score::line_score_status(snapshot));

    table
}

/// Add the tokens specific to no-hitter templates: the pitching side is the
/// opponent of the hitless batting side.
pub fn add_no_hitter_tokens(table: &mut TokenTable, snapshot: &Snapshot, no_hit_side: TeamSide) {
    let pitching = snapshot.team(no_hit_side.opponent());
    let batting = snapshot.team(no_hit_side);

    table.insert("pitcher_names", opt(pitching.probable_pitcher.clone()));
    table.insert("pitching_team", opt(pitching.name.clone()));
    table.insert("no_hit_team", opt(batting.name.clone()));
}

fn add_team_tokens(table: &mut TokenTable, team: &TeamSnapshot, names: [&'static str; 8]) {
    let [name, city, code, record, pitcher, runs, hits, errors] = names;
    table.insert(name, opt(team.name.clone()));
    table.insert(city, opt(team.location.clone()));
    table.insert(code, opt(team.abbreviation.clone()));
    table.insert(record, opt(team.record));
    table.insert(pitcher, opt(team.probable_pitcher.clone()));
    table.insert(runs, opt(team.line.runs));
    table.insert(hits, opt(team.line.hits));
    table.insert(errors, opt(team.line.errors));
}

fn opt<T: Display>(value: Option<T>) -> String {
    value
        .map(|inner| inner.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_owned())
}

#[cfg(test)]
mod tests {
    use crate::feed::models::TeamRecord;

    use super::*;

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::empty(7);
        snapshot.home.name = Some("Mariners".into());
        snapshot.home.record = Some(TeamRecord { wins: 60, losses: 52 });
        snapshot.away.name = Some("Athletics".into());
        snapshot.away.probable_pitcher = Some("JP Sears".into());
        snapshot.home.probable_pitcher = Some("Logan Gilbert".into());
        snapshot
    }

    #[test]
    fn known_tokens_substitute_and_unknown_stay_verbatim() {
        let table = token_table(&snapshot(), chrono_tz::America::Los_Angeles);
        let out = substitute("%{away_name} @ %{home_name} (%{home_record}) %{bogus_token}", &table);
        assert_eq!(out, "Athletics @ Mariners (60-52) %{bogus_token}");
    }

    #[test]
    fn missing_statistics_become_placeholders() {
        let table = token_table(&snapshot(), chrono_tz::America::Los_Angeles);
        assert_eq!(table["home_runs"], PLACEHOLDER);
        assert_eq!(table["away_record"], PLACEHOLDER);
        assert_eq!(table["start_time"], PLACEHOLDER);
    }

    #[test]
    fn no_hitter_tokens_point_at_the_pitching_side() {
        let mut table = TokenTable::new();
        add_no_hitter_tokens(&mut table, &snapshot(), TeamSide::Away);
        assert_eq!(table["pitcher_names"], "Logan Gilbert");
        assert_eq!(table["pitching_team"], "Mariners");
        assert_eq!(table["no_hit_team"], "Athletics");

        let mut table = TokenTable::new();
        add_no_hitter_tokens(&mut table, &snapshot(), TeamSide::Home);
        assert_eq!(table["pitcher_names"], "JP Sears");
        assert_eq!(table["pitching_team"], "Athletics");
    }
}
