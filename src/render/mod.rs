//! Template rendering: token substitution, line scores, and the in-place
//! update region.

/// Markdown line score table.
pub mod line_score;
/// Token table construction and substitution.
pub mod tokens;

use std::fmt;

use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;
use thiserror::Error;

use crate::feed::models::{Snapshot, TeamSide};

/// Marker emitted at thread creation, opening the machine-owned region.
pub const UPDATE_REGION_START: &str = "[](/update-start)";
/// Marker emitted at thread creation, closing the machine-owned region.
pub const UPDATE_REGION_END: &str = "[](/update-end)";
/// Token in gamechat bodies replaced with the submission's own id after
/// posting, so the thread can link to itself.
pub const SELF_ID_TOKEN: &str = "#ID#";

/// Longest title the posting platform accepts.
const TITLE_LIMIT: usize = 300;

/// The template kinds a subreddit can configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Primary live-game discussion thread.
    Gamechat,
    /// Region re-rendered into a live gamechat on every update pass.
    GamechatUpdate,
    /// Companion thread posted before the game.
    Pregame,
    /// Companion thread posted after the game.
    Postgame,
    /// Thread posted when a no-hitter is detected.
    NoHitter,
    /// Subreddit sidebar text.
    Sidebar,
}

impl TemplateKind {
    /// Configuration key for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::Gamechat => "gamechat",
            TemplateKind::GamechatUpdate => "gamechat_update",
            TemplateKind::Pregame => "pregame",
            TemplateKind::Postgame => "postgame",
            TemplateKind::NoHitter => "no_hitter",
            TemplateKind::Sidebar => "sidebar",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured `(title pattern, body template)` pair. Owned by
/// configuration and never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Title pattern; `%{token}` interpolations plus strftime codes.
    pub title: String,
    /// Body template; `%{token}` interpolations only.
    pub body: String,
}

/// A rendered title and body ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Platform-sanitized title.
    pub title: String,
    /// Markdown body.
    pub body: String,
}

/// Errors raised while rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The existing body does not carry the machine-owned region markers, so
    /// an in-place update cannot be applied.
    #[error("update region markers not found in body")]
    MissingMarkers,
}

/// Renders titles and bodies for one subreddit.
///
/// Token resolution never fails: a missing upstream statistic renders the
/// `?` placeholder so a single absent field cannot block posting.
#[derive(Debug, Clone)]
pub struct Renderer {
    timezone: Tz,
}

impl Renderer {
    /// A renderer producing local times in the given zone.
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Render a template against a live snapshot.
    pub fn render(&self, template: &Template, snapshot: &Snapshot) -> Rendered {
        self.render_with_tokens(template, snapshot, tokens::token_table(snapshot, self.timezone))
    }

    /// Render a no-hitter template; `no_hit_side` is the batting side with
    /// zero hits, which determines the pitching-team tokens.
    pub fn render_no_hitter(
        &self,
        template: &Template,
        snapshot: &Snapshot,
        no_hit_side: TeamSide,
    ) -> Rendered {
        let mut table = tokens::token_table(snapshot, self.timezone);
        tokens::add_no_hitter_tokens(&mut table, snapshot, no_hit_side);
        self.render_with_tokens(template, snapshot, table)
    }

    fn render_with_tokens(
        &self,
        template: &Template,
        snapshot: &Snapshot,
        table: tokens::TokenTable,
    ) -> Rendered {
        let title = tokens::substitute(&template.title, &table);
        let title = self.strftime(&title, snapshot);
        Rendered {
            title: sanitize_title(&title),
            body: tokens::substitute(&template.body, &table),
        }
    }

    /// Apply any strftime codes left in a title after token substitution,
    /// against first pitch in the subreddit's zone. A pattern chunk chrono
    /// cannot parse leaves the text untouched rather than failing the render.
    fn strftime(&self, pattern: &str, snapshot: &Snapshot) -> String {
        if !pattern.contains('%') {
            return pattern.to_owned();
        }
        let Some(starts_at) = snapshot.starts_at else {
            return pattern.to_owned();
        };

        let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return pattern.to_owned();
        }

        starts_at
            .with_timezone(&self.timezone)
            .format_with_items(items.into_iter())
            .to_string()
    }
}

/// Replace the machine-owned region of `body` with `region`, leaving all
/// surrounding human-authored text untouched.
///
/// Pure on immutable strings and idempotent: applying the same region twice
/// yields byte-identical output.
pub fn replace_update_region(body: &str, region: &str) -> Result<String, RenderError> {
    let start = body.find(UPDATE_REGION_START).ok_or(RenderError::MissingMarkers)?;
    let after_start = start + UPDATE_REGION_START.len();
    let end = body[after_start..]
        .find(UPDATE_REGION_END)
        .map(|offset| offset + after_start)
        .ok_or(RenderError::MissingMarkers)?;

    Ok(format!(
        "{}\n\n{}\n\n{}",
        &body[..after_start],
        region,
        &body[end..]
    ))
}

/// Replace the self-id token with the submission's assigned id.
pub fn fill_self_id(body: &str, post_id: &str) -> String {
    body.replace(SELF_ID_TOKEN, post_id)
}

/// Collapse a rendered title into a single platform-acceptable line.
fn sanitize_title(title: &str) -> String {
    let decoded = html_escape::decode_html_entities(title);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(TITLE_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::feed::models::{GameStatus, TeamRecord};

    use super::*;

    fn snapshot() -> Snapshot {
        let mut snapshot = Snapshot::empty(100);
        snapshot.status = GameStatus::Preview;
        snapshot.home.name = Some("Mariners".into());
        snapshot.home.location = Some("Seattle".into());
        snapshot.home.abbreviation = Some("SEA".into());
        snapshot.home.record = Some(TeamRecord { wins: 60, losses: 52 });
        snapshot.away.name = Some("Athletics".into());
        snapshot.away.abbreviation = Some("ATH".into());
        snapshot.starts_at = Some(Utc.with_ymd_and_hms(2026, 8, 6, 2, 10, 0).unwrap());
        snapshot
    }

    #[test]
    fn tokens_and_strftime_compose_in_titles() {
        let renderer = Renderer::new(chrono_tz::America::Los_Angeles);
        let template = Template {
            title: "Game Thread: %{away_name} @ %{home_name} - %B %-d, %Y".into(),
            body: String::new(),
        };

        let rendered = renderer.render(&template, &snapshot());
        assert_eq!(rendered.title, "Game Thread: Athletics @ Mariners - August 5, 2026");
    }

    #[test]
    fn missing_fields_render_placeholders() {
        let renderer = Renderer::new(chrono_tz::America::Los_Angeles);
        let template = Template {
            title: "%{away_name} (%{away_record}) @ %{home_name}".into(),
            body: "%{home_pitcher} vs %{away_pitcher}".into(),
        };

        let rendered = renderer.render(&template, &snapshot());
        assert_eq!(rendered.title, "Athletics (?) @ Mariners");
        assert_eq!(rendered.body, "? vs ?");
    }

    #[test]
    fn invalid_strftime_chunk_is_left_untouched() {
        let renderer = Renderer::new(chrono_tz::America::Los_Angeles);
        let template = Template {
            title: "Thread %Q".into(),
            body: String::new(),
        };
        assert_eq!(renderer.render(&template, &snapshot()).title, "Thread %Q");
    }

    #[test]
    fn titles_collapse_onto_one_line_and_clamp() {
        let long = "a ".repeat(400);
        let sanitized = sanitize_title(&format!("Line one\nLine two {long}"));
        assert!(!sanitized.contains('\n'));
        assert!(sanitized.chars().count() <= 300);
        assert!(sanitized.starts_with("Line one Line two"));
    }

    #[test]
    fn update_region_replacement_is_idempotent() {
        let body = format!(
            "Intro text.\n\n{UPDATE_REGION_START}\n\nold region\n\n{UPDATE_REGION_END}\n\nHuman outro."
        );

        let once = replace_update_region(&body, "new region").unwrap();
        let twice = replace_update_region(&once, "new region").unwrap();
        assert_eq!(once, twice);
        assert!(once.contains("Intro text."));
        assert!(once.contains("Human outro."));
        assert!(once.contains("new region"));
        assert!(!once.contains("old region"));
    }

    #[test]
    fn update_region_requires_both_markers() {
        assert_eq!(
            replace_update_region("no markers here", "region"),
            Err(RenderError::MissingMarkers)
        );
        assert_eq!(
            replace_update_region(UPDATE_REGION_START, "region"),
            Err(RenderError::MissingMarkers)
        );
    }

    #[test]
    fn self_id_token_is_filled() {
        assert_eq!(fill_self_id("see #ID# above", "abc123"), "see abc123 above");
    }
}
