use crate::app::MenuItem;
use crate::playback::{Orientation, PlaybackSession, SessionSnapshot};
use crate::ranking::{MatchStatus, RankedMatch, RankedSection};
use crate::surface::EmbedSurface;
use chrono::{DateTime, Local, TimeZone};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const NOTICE_TTL: Duration = Duration::from_secs(4);

// ---------------------------------------------------------------------------
// Home sections
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct HomeState {
    pub sections: Vec<RankedSection>,
    pub selected_section: usize,
    pub selected_match: usize,
    /// Wall-clock label of the last successful refresh.
    pub last_refreshed: Option<String>,
}

impl HomeState {
    /// Replace the sections, keeping the cursor on the same sport and match
    /// when they survived the refresh.
    pub fn load(&mut self, sections: Vec<RankedSection>) {
        let sport_id = self.selected_section().map(|s| s.sport_id.clone());
        let match_id = self.selected_match().map(|m| m.record.id.clone());

        self.sections = sections;
        self.selected_section = sport_id
            .and_then(|id| self.sections.iter().position(|s| s.sport_id == id))
            .unwrap_or(0);
        self.selected_match = match_id
            .and_then(|id| {
                self.selected_section()?
                    .matches
                    .iter()
                    .position(|m| m.record.id == id)
            })
            .unwrap_or(0);
    }

    pub fn selected_section(&self) -> Option<&RankedSection> {
        self.sections.get(self.selected_section)
    }

    pub fn selected_match(&self) -> Option<&RankedMatch> {
        self.selected_section()?.matches.get(self.selected_match)
    }

    pub fn next_section(&mut self) {
        if self.selected_section + 1 < self.sections.len() {
            self.selected_section += 1;
            self.selected_match = 0;
        }
    }

    pub fn prev_section(&mut self) {
        if self.selected_section > 0 {
            self.selected_section -= 1;
            self.selected_match = 0;
        }
    }

    pub fn match_down(&mut self) {
        let max = self
            .selected_section()
            .map(|s| s.matches.len().saturating_sub(1))
            .unwrap_or(0);
        if self.selected_match < max {
            self.selected_match += 1;
        }
    }

    pub fn match_up(&mut self) {
        self.selected_match = self.selected_match.saturating_sub(1);
    }
}

/// "LIVE" for live matches, otherwise a local day and time.
pub fn match_time_label<Tz: TimeZone>(m: &RankedMatch, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if m.status == MatchStatus::Live {
        return "LIVE".to_string();
    }
    let Some(start) = m.record.start_time() else {
        return "TBD".to_string();
    };
    let start = start.with_timezone(&now.timezone());
    let days = (start.date_naive() - now.date_naive()).num_days();
    let time = start.format("%H:%M");
    let day = match days {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => start.format("%a %d %b").to_string(),
    };
    format!("{day} {time}")
}

pub fn local_time_label(now: DateTime<Local>) -> String {
    now.format("%H:%M").to_string()
}

// ---------------------------------------------------------------------------
// Stream view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    SourcePicker { selected: usize },
    ConfirmBrowser { url: String },
}

#[derive(Debug)]
pub struct StreamViewState {
    pub match_id: String,
    pub session: PlaybackSession,
    pub surface: EmbedSurface,
    pub overlay: Option<Overlay>,
    /// Terminal message shown in place of the player, e.g. no stream.
    pub status: Option<String>,
}

impl StreamViewState {
    pub fn new(match_id: String, session: PlaybackSession) -> Self {
        Self {
            match_id,
            session,
            surface: EmbedSurface::default(),
            overlay: None,
            status: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_resolving() || self.surface.is_loading()
    }
}

// ---------------------------------------------------------------------------
// Transient notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub expires_at: Instant,
}

impl Notice {
    pub fn new(text: impl Into<String>, now: Instant) -> Self {
        Self { text: text.into(), expires_at: now + NOTICE_TTL }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub last_error: Option<String>,
    pub orientation: Orientation,
    pub home: HomeState,
    pub stream: Option<StreamViewState>,
    /// Last position per match id, restored when the match is reopened.
    pub snapshots: HashMap<String, SessionSnapshot>,
    pub notice: Option<Notice>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use streamed_api::Match;

    fn section(id: &str, match_ids: &[&str]) -> RankedSection {
        RankedSection {
            sport_id: id.to_string(),
            sport_name: id.to_string(),
            matches: match_ids
                .iter()
                .map(|m| RankedMatch::new(Match { id: m.to_string(), ..Default::default() }, 0))
                .collect(),
        }
    }

    #[test]
    fn reload_keeps_cursor_on_surviving_match() {
        let mut home = HomeState::default();
        home.load(vec![section("football", &["a", "b"]), section("tennis", &["c", "d", "e"])]);
        home.next_section();
        home.match_down();
        home.match_down();
        assert_eq!(home.selected_match().map(|m| m.record.id.as_str()), Some("e"));

        home.load(vec![section("tennis", &["e", "c"]), section("football", &["a"])]);
        assert_eq!(home.selected_section, 0);
        assert_eq!(home.selected_match().map(|m| m.record.id.as_str()), Some("e"));

        home.load(vec![section("darts", &["x"])]);
        assert_eq!((home.selected_section, home.selected_match), (0, 0));
    }

    #[test]
    fn navigation_is_clamped() {
        let mut home = HomeState::default();
        home.match_down();
        home.next_section();
        assert_eq!((home.selected_section, home.selected_match), (0, 0));

        home.load(vec![section("football", &["a"])]);
        home.match_down();
        home.prev_section();
        assert_eq!((home.selected_section, home.selected_match), (0, 0));
    }

    #[test]
    fn time_labels() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let now = tz.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        let at = |d: u32, h: u32| tz.with_ymd_and_hms(2026, 10, d, h, 30, 0).unwrap().timestamp_millis();
        let ranked = |date: i64, live: bool| {
            RankedMatch::new(Match { date, is_live: live, ..Default::default() }, now.timestamp_millis())
        };

        assert_eq!(match_time_label(&ranked(at(17, 11), true), &now), "LIVE");
        assert_eq!(match_time_label(&ranked(0, false), &now), "TBD");
        assert_eq!(match_time_label(&ranked(at(17, 19), false), &now), "Today 19:30");
        assert_eq!(match_time_label(&ranked(at(18, 9), false), &now), "Tomorrow 09:30");
        assert_eq!(match_time_label(&ranked(at(16, 20), false), &now), "Yesterday 20:30");
        assert_eq!(match_time_label(&ranked(at(21, 20), false), &now), "Wed 21 Oct 20:30");
    }

    #[test]
    fn notices_expire() {
        let now = Instant::now();
        let notice = Notice::new("hi", now);
        assert!(notice.is_visible(now));
        assert!(!notice.is_visible(now + NOTICE_TTL));
    }
}
