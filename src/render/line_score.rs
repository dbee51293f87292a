use crate::feed::models::{Snapshot, TeamSide};

/// Minimum number of inning columns; extra innings widen the table.
const MIN_INNINGS: u32 = 9;

/// Render the markdown line score table: one column per inning, then bold
/// R/H/E totals, away line above home line.
pub fn line_score(snapshot: &Snapshot) -> String {
    let columns = snapshot
        .innings
        .iter()
        .map(|inning| inning.num)
        .max()
        .unwrap_or(0)
        .max(MIN_INNINGS);

    let header = (1..=columns)
        .map(|num| num.to_string())
        .collect::<Vec<_>>()
        .join("|");
    let separator = ":-:|".repeat(columns as usize);

    [
        format!(" |{header}|R|H|E"),
        format!(":-:|{separator}:-:|:-:|:-:"),
        line_for_team(snapshot, TeamSide::Away, columns),
        line_for_team(snapshot, TeamSide::Home, columns),
    ]
    .join("\n")
}

/// One-line game status: the feed's detailed state before/after play,
/// otherwise the half-inning and out count.
pub fn line_score_status(snapshot: &Snapshot) -> String {
    if !snapshot.status.is_live() {
        return snapshot
            .detailed_state
            .clone()
            .unwrap_or_else(|| super::tokens::PLACEHOLDER.to_owned());
    }

    let inning = match (snapshot.inning_half, snapshot.current_inning) {
        (Some(half), Some(num)) => format!("{half} of the {}", ordinal(num)),
        _ => return super::tokens::PLACEHOLDER.to_owned(),
    };

    match snapshot.outs {
        // A finished half-inning reads better without the out count.
        Some(3) | None => inning,
        Some(1) => format!("{inning}, 1 Out"),
        Some(outs) => format!("{inning}, {outs} Outs"),
    }
}

fn line_for_team(snapshot: &Snapshot, side: TeamSide, columns: u32) -> String {
    let team = snapshot.team(side);
    let code = team
        .abbreviation
        .clone()
        .unwrap_or_else(|| super::tokens::PLACEHOLDER.to_owned());

    let cells = (1..=columns)
        .map(|num| {
            snapshot
                .innings
                .iter()
                .find(|inning| inning.num == num)
                .and_then(|inning| match side {
                    TeamSide::Away => inning.away_runs,
                    TeamSide::Home => inning.home_runs,
                })
                .map(|runs| runs.to_string())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join("|");

    format!(
        "[{code}](/{code})|{cells}|**{}**|**{}**|**{}**",
        team.line.runs.unwrap_or(0),
        team.line.hits.unwrap_or(0),
        team.line.errors.unwrap_or(0),
    )
}

/// `1 → 1st`, `2 → 2nd`, `11 → 11th`.
fn ordinal(num: u32) -> String {
    let suffix = match (num % 10, num % 100) {
        (1, n) if n != 11 => "st",
        (2, n) if n != 12 => "nd",
        (3, n) if n != 13 => "rd",
        _ => "th",
    };
    format!("{num}{suffix}")
}
