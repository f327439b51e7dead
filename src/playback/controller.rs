use log::{debug, warn};
use std::time::{Duration, Instant};
use streamed_api::StreamItem;
use url::Url;

/// What the web content host should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStep {
    Load { index: usize, url: String },
    Reload { index: usize, url: String },
    /// Nothing left to try.
    NoStreamAvailable,
}

/// Playable embeds in response order; blank or missing URLs are dropped.
pub fn embed_candidates(items: &[StreamItem]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.embed_url.as_deref())
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_ascii_lowercase)
}

/// Drives one playback surface through an ordered list of candidate embeds.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    candidates: Vec<String>,
    index: usize,
    current_host: Option<String>,
    fullscreen: bool,
    last_fullscreen_at: Option<Instant>,
    pip_grace: Duration,
}

impl PlaybackController {
    pub fn new(pip_grace: Duration) -> Self {
        Self {
            candidates: Vec::new(),
            index: 0,
            current_host: None,
            fullscreen: false,
            last_fullscreen_at: None,
            pip_grace,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_host(&self) -> Option<&str> {
        self.current_host.as_deref()
    }

    pub fn current_url(&self) -> Option<&str> {
        self.candidates.get(self.index).map(String::as_str)
    }

    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Forget the current candidates, e.g. when switching source.
    pub fn reset(&mut self) {
        self.candidates.clear();
        self.index = 0;
        self.current_host = None;
    }

    /// Install a freshly resolved candidate list and load `start_index`,
    /// clamped to the list.
    pub fn start(&mut self, candidates: Vec<String>, start_index: usize) -> PlaybackStep {
        self.candidates = candidates;
        if self.candidates.is_empty() {
            self.index = 0;
            self.current_host = None;
            return PlaybackStep::NoStreamAvailable;
        }
        let index = start_index.min(self.candidates.len() - 1);
        self.load(index)
    }

    fn load(&mut self, index: usize) -> PlaybackStep {
        let url = self.candidates[index].clone();
        self.index = index;
        self.current_host = host_of(&url);
        debug!("loading embed [{}/{}] = {url}", index, self.candidates.len());
        PlaybackStep::Load { index, url }
    }

    /// Navigation away from the embed's own host is refused.
    pub fn should_block_navigation(&self, target_host: Option<&str>) -> bool {
        match (self.current_host.as_deref(), target_host) {
            (Some(current), Some(target)) if !current.eq_ignore_ascii_case(target) => {
                warn!("blocking navigation to non-embed host={target} while on {current}");
                true
            }
            _ => false,
        }
    }

    /// Errors from sub-resources are ignored. A top-level error reported for a
    /// host other than the embed's is treated as noise and the embed reloads;
    /// otherwise the next candidate is tried.
    pub fn on_load_error(&mut self, host: Option<&str>, main_frame: bool) -> Option<PlaybackStep> {
        if !main_frame {
            return None;
        }
        match (host, self.current_host.as_deref()) {
            (Some(host), Some(current)) if !host.eq_ignore_ascii_case(current) => {
                warn!("ignoring main-frame error from non-embed host={host}, reloading {current}");
                Some(self.reload_current())
            }
            _ => Some(self.advance()),
        }
    }

    pub fn advance(&mut self) -> PlaybackStep {
        let next = self.index + 1;
        if next < self.candidates.len() {
            self.load(next)
        } else {
            warn!("embed candidates exhausted after {}", self.candidates.len());
            PlaybackStep::NoStreamAvailable
        }
    }

    pub fn reload_current(&mut self) -> PlaybackStep {
        match self.candidates.get(self.index) {
            Some(url) => PlaybackStep::Reload { index: self.index, url: url.clone() },
            None if !self.candidates.is_empty() => self.load(0),
            None => PlaybackStep::NoStreamAvailable,
        }
    }

    // -----------------------------------------------------------------------
    // Fullscreen video bookkeeping for PiP eligibility
    // -----------------------------------------------------------------------

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Returns false when already fullscreen.
    pub fn enter_fullscreen(&mut self, now: Instant) -> bool {
        if self.fullscreen {
            return false;
        }
        self.fullscreen = true;
        self.last_fullscreen_at = Some(now);
        true
    }

    /// Returns false when not fullscreen.
    pub fn exit_fullscreen(&mut self) -> bool {
        std::mem::replace(&mut self.fullscreen, false)
    }

    pub fn mark_fullscreen_activity(&mut self, now: Instant) {
        self.last_fullscreen_at = Some(now);
    }

    pub fn recently_fullscreen(&self, now: Instant) -> bool {
        self.last_fullscreen_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.pip_grace)
    }

    /// Leaving the app only triggers PiP from fullscreen video or shortly after.
    pub fn pip_on_leave_eligible(&self, now: Instant) -> bool {
        self.fullscreen || self.recently_fullscreen(now)
    }

    /// Native PiP needs something playing, and outside fullscreen only a
    /// forced fallback may enter it.
    pub fn native_pip_allowed(&self, forced: bool) -> bool {
        self.has_candidates() && (forced || self.fullscreen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "https://a.example/embed/1";
    const B: &str = "https://b.example/embed/2";
    const C: &str = "https://c.example/embed/3";

    fn controller() -> PlaybackController {
        PlaybackController::new(Duration::from_secs(5))
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn candidates_skip_blank_urls_and_keep_order() {
        let item = |url: Option<&str>| StreamItem { embed_url: url.map(str::to_string), ..Default::default() };
        let items = [item(Some(B)), item(None), item(Some("  ")), item(Some(A))];
        assert_eq!(embed_candidates(&items), urls(&[B, A]));
    }

    #[test]
    fn start_loads_first_and_records_host() {
        let mut c = controller();
        assert_eq!(c.start(urls(&[A, B]), 0), PlaybackStep::Load { index: 0, url: A.into() });
        assert_eq!(c.current_host(), Some("a.example"));
    }

    #[test]
    fn start_clamps_restored_index() {
        let mut c = controller();
        assert_eq!(c.start(urls(&[A, B]), 7), PlaybackStep::Load { index: 1, url: B.into() });
    }

    #[test]
    fn start_without_candidates_reports_no_stream() {
        let mut c = controller();
        assert_eq!(c.start(Vec::new(), 0), PlaybackStep::NoStreamAvailable);
        assert_eq!(c.current_host(), None);
    }

    #[test]
    fn same_host_error_advances_foreign_host_error_reloads() {
        let mut c = controller();
        c.start(urls(&[A, B, C]), 0);

        let step = c.on_load_error(Some("a.example"), true);
        assert_eq!(step, Some(PlaybackStep::Load { index: 1, url: B.into() }));

        let step = c.on_load_error(Some("ads.tracker.example"), true);
        assert_eq!(step, Some(PlaybackStep::Reload { index: 1, url: B.into() }));
        assert_eq!(c.current_index(), 1);
    }

    #[test]
    fn error_without_host_advances() {
        let mut c = controller();
        c.start(urls(&[A, B]), 0);
        assert_eq!(c.on_load_error(None, true), Some(PlaybackStep::Load { index: 1, url: B.into() }));
    }

    #[test]
    fn subresource_errors_are_ignored() {
        let mut c = controller();
        c.start(urls(&[A, B]), 0);
        assert_eq!(c.on_load_error(Some("a.example"), false), None);
        assert_eq!(c.current_index(), 0);
    }

    #[test]
    fn last_candidate_error_is_exhaustion() {
        let mut c = controller();
        c.start(urls(&[A]), 0);
        assert_eq!(c.on_load_error(Some("a.example"), true), Some(PlaybackStep::NoStreamAvailable));
        assert_eq!(c.current_index(), 0);
    }

    #[test]
    fn navigation_off_embed_host_is_blocked() {
        let mut c = controller();
        assert!(!c.should_block_navigation(Some("anything.example")));
        c.start(urls(&[A]), 0);
        assert!(c.should_block_navigation(Some("popunder.example")));
        assert!(!c.should_block_navigation(Some("A.Example")));
        assert!(!c.should_block_navigation(None));
    }

    #[test]
    fn reload_out_of_range_restarts_at_first() {
        let mut c = controller();
        c.start(urls(&[A, B]), 1);
        c.candidates.truncate(1);
        assert_eq!(c.reload_current(), PlaybackStep::Load { index: 0, url: A.into() });
    }

    #[test]
    fn reset_clears_embed_state() {
        let mut c = controller();
        c.start(urls(&[A, B]), 1);
        c.reset();
        assert!(!c.has_candidates());
        assert_eq!(c.current_index(), 0);
        assert_eq!(c.current_host(), None);
    }

    #[test]
    fn leave_eligibility_uses_grace_window() {
        let mut c = controller();
        let t0 = Instant::now();
        assert!(!c.pip_on_leave_eligible(t0));

        assert!(c.enter_fullscreen(t0));
        assert!(!c.enter_fullscreen(t0));
        assert!(c.pip_on_leave_eligible(t0 + Duration::from_secs(60)));

        assert!(c.exit_fullscreen());
        assert!(!c.exit_fullscreen());
        assert!(c.pip_on_leave_eligible(t0 + Duration::from_secs(4)));
        assert!(!c.pip_on_leave_eligible(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn native_pip_needs_fullscreen_unless_forced() {
        let mut c = controller();
        assert!(!c.native_pip_allowed(true));
        c.start(urls(&[A]), 0);
        assert!(!c.native_pip_allowed(false));
        assert!(c.native_pip_allowed(true));
        c.enter_fullscreen(Instant::now());
        assert!(c.native_pip_allowed(false));
    }
}
