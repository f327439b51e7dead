use crate::playback::{
    ChromeEvent, LaunchParams, Orientation, PipDecision, PipTrigger, PlaybackSession, PlaybackStep,
    SessionStart,
};
use crate::ranking::RankedSection;
use crate::state::app_settings::AppSettings;
use crate::state::app_state::{AppState, Notice, Overlay, StreamViewState, local_time_label};
use crate::state::messages::NetworkRequest;
use crate::surface::HostEvent;
use chrono::Local;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use streamed_api::{StreamItem, StreamSource};

const NO_STREAM: &str = "No stream available";

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Home,
    Stream,
    Help,
}

/// A PiP negotiation the caller should run off the UI loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipRequest {
    pub match_id: String,
    pub trigger: PipTrigger,
    pub fallback_url: Option<String>,
}

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
}

impl App {
    pub fn new() -> Self {
        Self::with_settings(AppSettings::load())
    }

    pub fn with_settings(settings: AppSettings) -> Self {
        let app = Self {
            state: AppState::new(),
            settings,
        };

        if let Some(level) = app.settings.log_level {
            log::set_max_level(level);
            tui_logger::set_default_level(level);
        }

        app
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    /// Snapshots of matches that dropped out of the listing are discarded.
    pub fn on_sections_loaded(&mut self, sections: Vec<RankedSection>) {
        info!("loaded {} sections", sections.len());
        self.state.last_error = None;
        let listed: HashSet<&str> = sections
            .iter()
            .flat_map(|s| s.matches.iter().map(|m| m.record.id.as_str()))
            .collect();
        self.state.snapshots.retain(|id, _| listed.contains(id.as_str()));
        self.state.home.load(sections);
        self.state.home.last_refreshed = Some(local_time_label(Local::now()));
    }

    /// Keeps whatever sections were already on screen.
    pub fn on_refresh_failed(&mut self, message: String) {
        self.state.last_error = Some(message);
    }

    pub fn on_streams_loaded(&mut self, source: StreamSource, streams: Vec<StreamItem>) -> Vec<NetworkRequest> {
        let Some(view) = self.state.stream.as_mut() else {
            return Vec::new();
        };
        match view.session.on_streams_resolved(&source, &streams) {
            Some(step) => self.apply_step(step).into_iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn on_streams_failed(&mut self, source: StreamSource, message: String) {
        let Some(view) = self.state.stream.as_mut() else {
            return;
        };
        if view.session.on_streams_failed(&source) {
            warn!("stream lookup failed for {}: {message}", source.key());
            view.surface.clear();
            view.status = Some(NO_STREAM.to_string());
        }
    }

    pub fn on_source_languages(&mut self, languages: HashMap<String, String>) {
        if let Some(view) = self.state.stream.as_mut()
            && view.session.apply_language_map(&languages)
        {
            debug!("source languages updated");
        }
    }

    /// Results for an embed that is no longer on screen are dropped.
    pub fn on_embed_loaded(&mut self, url: String, events: Vec<HostEvent>, now: Instant) -> Vec<NetworkRequest> {
        let is_current = self
            .state
            .stream
            .as_ref()
            .is_some_and(|view| view.surface.is_current(&url));
        if !is_current {
            debug!("dropping stale embed load for {url}");
            return Vec::new();
        }
        events
            .into_iter()
            .filter_map(|event| self.on_host_event(event, now))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Web content host events
    // -----------------------------------------------------------------------

    pub fn on_host_event(&mut self, event: HostEvent, now: Instant) -> Option<NetworkRequest> {
        let view = self.state.stream.as_mut()?;
        match event {
            HostEvent::NavigationAttempt { host } => {
                if view.session.controller.should_block_navigation(host.as_deref()) {
                    let target = host.unwrap_or_default();
                    self.state.notice = Some(Notice::new(format!("Blocked navigation to {target}"), now));
                }
                None
            }
            HostEvent::LoadError { host, main_frame } => {
                let step = view.session.controller.on_load_error(host.as_deref(), main_frame)?;
                self.apply_step(step)
            }
            HostEvent::Progress(progress) => {
                view.surface.set_progress(progress);
                None
            }
            HostEvent::FullscreenEntered => {
                if view.session.controller.is_fullscreen() {
                    debug!("already fullscreen");
                    return None;
                }
                view.session.on_chrome_event(ChromeEvent::FullscreenEntered, now);
                None
            }
            HostEvent::FullscreenExited => {
                if view.session.controller.is_fullscreen() {
                    view.session.controller.mark_fullscreen_activity(now);
                }
                view.session.on_chrome_event(ChromeEvent::FullscreenExited, now);
                None
            }
        }
    }

    /// Hand a controller step to the surface; returns the load to start.
    fn apply_step(&mut self, step: PlaybackStep) -> Option<NetworkRequest> {
        let view = self.state.stream.as_mut()?;
        let url = view.surface.apply(&step);
        view.status = match step {
            PlaybackStep::NoStreamAvailable => Some(NO_STREAM.to_string()),
            _ => None,
        };
        url.map(|url| NetworkRequest::LoadEmbed { url })
    }

    // -----------------------------------------------------------------------
    // Home screen
    // -----------------------------------------------------------------------

    pub fn next_section(&mut self) {
        self.state.home.next_section();
    }

    pub fn prev_section(&mut self) {
        self.state.home.prev_section();
    }

    pub fn match_down(&mut self) {
        self.state.home.match_down();
    }

    pub fn match_up(&mut self) {
        self.state.home.match_up();
    }

    /// Open the selected match. A snapshot left by an earlier viewing of the
    /// same match puts the session back on its source and embed.
    pub fn open_selected_match(&mut self, now: Instant) -> Vec<NetworkRequest> {
        let Some(selected) = self.state.home.selected_match() else {
            return Vec::new();
        };
        let record = &selected.record;
        let params = LaunchParams {
            match_title: record.title.clone(),
            source_key: None,
            source_id: None,
            sources: record.sources.clone(),
        };
        let match_id = record.id.clone();
        self.open_session(match_id, params, now)
    }

    pub fn open_session(&mut self, match_id: String, params: LaunchParams, now: Instant) -> Vec<NetworkRequest> {
        let snapshot = self.state.snapshots.get(&match_id);
        let (mut session, start) = PlaybackSession::open(params, snapshot, self.settings.pip_grace);
        session.on_chrome_event(ChromeEvent::OrientationChanged(self.state.orientation), now);

        let mut requests = Vec::new();
        if session.sources().len() > 1 {
            requests.push(NetworkRequest::PrefetchLanguages { sources: session.sources().to_vec() });
        }

        let mut view = StreamViewState::new(match_id, session);
        match start {
            SessionStart::Resolve(source) => requests.insert(0, NetworkRequest::LoadStreams { source }),
            SessionStart::PromptSource => view.overlay = Some(Overlay::SourcePicker { selected: 0 }),
            SessionStart::NoStreamAvailable => view.status = Some(NO_STREAM.to_string()),
        }

        self.state.stream = Some(view);
        self.update_tab(MenuItem::Stream);
        requests
    }

    // -----------------------------------------------------------------------
    // Stream view
    // -----------------------------------------------------------------------

    /// Back out of the stream view. From fullscreen this only leaves
    /// fullscreen; otherwise the session is snapshotted and closed.
    pub fn back(&mut self, now: Instant) {
        let Some(view) = self.state.stream.as_mut() else {
            self.update_tab(MenuItem::Home);
            return;
        };
        if view.overlay.take().is_some() {
            return;
        }
        if view.session.controller.is_fullscreen() {
            self.on_host_event(HostEvent::FullscreenExited, now);
            return;
        }
        if let Some(view) = self.state.stream.take() {
            let snapshot = view.session.snapshot();
            debug!("saving session for {}: {snapshot:?}", view.match_id);
            self.state.snapshots.insert(view.match_id, snapshot);
        }
        self.update_tab(MenuItem::Home);
    }

    pub fn toggle_fullscreen(&mut self, now: Instant) {
        let Some(view) = self.state.stream.as_ref() else {
            return;
        };
        let event = if view.session.controller.is_fullscreen() {
            HostEvent::FullscreenExited
        } else {
            HostEvent::FullscreenEntered
        };
        self.on_host_event(event, now);
    }

    /// Viewer says the current embed is broken.
    pub fn skip_embed(&mut self) -> Option<NetworkRequest> {
        let view = self.state.stream.as_mut()?;
        if !view.session.controller.has_candidates() {
            return None;
        }
        let step = view.session.controller.advance();
        self.apply_step(step)
    }

    pub fn reload_embed(&mut self) -> Option<NetworkRequest> {
        let view = self.state.stream.as_mut()?;
        if !view.session.controller.has_candidates() {
            return None;
        }
        let step = view.session.controller.reload_current();
        self.apply_step(step)
    }

    pub fn open_source_picker(&mut self) {
        let Some(view) = self.state.stream.as_mut() else {
            return;
        };
        if view.session.sources().is_empty() {
            return;
        }
        let selected = view
            .session
            .current_source()
            .and_then(|current| view.session.sources().iter().position(|s| s.same_stream(current)))
            .unwrap_or(0);
        view.overlay = Some(Overlay::SourcePicker { selected });
    }

    pub fn picker_move(&mut self, down: bool) {
        let Some(view) = self.state.stream.as_mut() else {
            return;
        };
        let count = view.session.sources().len();
        if let Some(Overlay::SourcePicker { selected }) = view.overlay.as_mut() {
            *selected = if down {
                (*selected + 1).min(count.saturating_sub(1))
            } else {
                selected.saturating_sub(1)
            };
        }
    }

    pub fn picker_confirm(&mut self) -> Option<NetworkRequest> {
        let view = self.state.stream.as_mut()?;
        let Some(Overlay::SourcePicker { selected }) = view.overlay else {
            return None;
        };
        let source = view.session.sources().get(selected)?.clone();
        view.overlay = None;
        view.status = None;
        view.surface.clear();
        let source = view.session.select_source(source, 0);
        Some(NetworkRequest::LoadStreams { source })
    }

    /// The PiP control. Outside fullscreen there is nothing to shrink, so
    /// only a hint is shown.
    pub fn request_pip(&mut self, now: Instant) -> Option<PipRequest> {
        let view = self.state.stream.as_ref()?;
        if !view.session.controller.is_fullscreen() {
            self.state.notice = Some(Notice::new("Enter fullscreen to use picture-in-picture", now));
            return None;
        }
        Some(PipRequest {
            match_id: view.match_id.clone(),
            trigger: PipTrigger::UserRequest,
            fallback_url: view.session.controller.current_url().map(ToString::to_string),
        })
    }

    /// The terminal lost focus. Only fullscreen video, or video that left
    /// fullscreen within the grace window, goes picture-in-picture.
    pub fn on_leave(&mut self, now: Instant) -> Option<PipRequest> {
        let view = self.state.stream.as_ref()?;
        let controller = &view.session.controller;
        if !controller.has_candidates() || !controller.pip_on_leave_eligible(now) {
            return None;
        }
        Some(PipRequest {
            match_id: view.match_id.clone(),
            trigger: PipTrigger::LeaveHint,
            fallback_url: controller.current_url().map(ToString::to_string),
        })
    }

    /// Decisions that arrive after the viewer moved to another match are dropped.
    pub fn on_pip_decided(&mut self, match_id: &str, trigger: PipTrigger, decision: PipDecision, now: Instant) {
        let Some(view) = self.state.stream.as_mut() else {
            return;
        };
        if view.match_id != match_id {
            debug!("dropping PiP decision for {match_id}, now viewing {}", view.match_id);
            return;
        }
        debug!("PiP decision for {trigger:?}: {decision:?}");
        match decision {
            PipDecision::InPage => {
                self.state.notice = Some(Notice::new("Playing picture-in-picture", now));
            }
            PipDecision::NativePip { aspect } => {
                if view.session.controller.native_pip_allowed(true) {
                    info!("entering native PiP at {}:{}", aspect.0, aspect.1);
                    view.session.on_chrome_event(ChromeEvent::PipModeChanged(true), now);
                }
            }
            PipDecision::OfferBrowser { url } => {
                view.overlay = Some(Overlay::ConfirmBrowser { url });
            }
            PipDecision::Notice(text) => {
                self.state.notice = Some(Notice::new(text, now));
            }
        }
    }

    pub fn on_focus_gained(&mut self, now: Instant) {
        if let Some(view) = self.state.stream.as_mut() {
            if view.session.chrome.is_native_pip() {
                view.session.on_chrome_event(ChromeEvent::PipModeChanged(false), now);
            }
            view.session.on_chrome_event(ChromeEvent::Resumed, now);
        }
    }

    pub fn on_resize(&mut self, width: u16, height: u16, now: Instant) {
        let orientation = Orientation::from_cells(width, height);
        self.state.orientation = orientation;
        if let Some(view) = self.state.stream.as_mut() {
            view.session.on_chrome_event(ChromeEvent::OrientationChanged(orientation), now);
        }
    }

    /// Offer to open the current embed outside the terminal.
    pub fn offer_browser(&mut self, now: Instant) {
        let Some(view) = self.state.stream.as_mut() else {
            return;
        };
        match view.session.controller.current_url() {
            Some(url) => view.overlay = Some(Overlay::ConfirmBrowser { url: url.to_string() }),
            None => self.state.notice = Some(Notice::new(NO_STREAM, now)),
        }
    }

    /// Accepting the browser prompt hands back the URL to launch.
    pub fn confirm_browser(&mut self, accept: bool) -> Option<String> {
        let view = self.state.stream.as_mut()?;
        let Some(Overlay::ConfirmBrowser { url }) = view.overlay.take() else {
            return None;
        };
        accept.then_some(url)
    }

    pub fn on_browser_launch_failed(&mut self, message: String, now: Instant) {
        warn!("browser launch failed: {message}");
        self.state.notice = Some(Notice::new("Couldn't open the browser", now));
    }

    pub fn visible_notice(&self, now: Instant) -> Option<&str> {
        self.state
            .notice
            .as_ref()
            .filter(|n| n.is_visible(now))
            .map(|n| n.text.as_str())
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) {
        if self.state.active_tab == next {
            return;
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
    }

    pub fn exit_help(&mut self) {
        if self.state.active_tab == MenuItem::Help {
            self.state.active_tab = self.state.previous_tab;
        }
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::ChromeState;
    use crate::ranking::RankedMatch;
    use std::time::Duration;
    use streamed_api::Match;

    const A: &str = "https://a.example/embed/1";
    const B: &str = "https://b.example/embed/2";

    fn app() -> App {
        App::with_settings(AppSettings::default())
    }

    fn items(urls: &[&str]) -> Vec<StreamItem> {
        urls.iter()
            .map(|u| StreamItem { embed_url: Some(u.to_string()), ..Default::default() })
            .collect()
    }

    fn home_with(sources: Vec<StreamSource>) -> App {
        let mut app = app();
        let record = Match { id: "m1".into(), title: "A vs B".into(), sources, ..Default::default() };
        app.on_sections_loaded(vec![RankedSection {
            sport_id: "football".into(),
            sport_name: "Football".into(),
            matches: vec![RankedMatch::new(record, 0)],
        }]);
        app
    }

    fn alpha() -> StreamSource {
        StreamSource::new("alpha", "1")
    }

    /// Single-source match opened, streams resolved, first embed loaded.
    fn playing(now: Instant) -> App {
        let mut app = home_with(vec![alpha()]);
        let requests = app.open_selected_match(now);
        assert!(matches!(requests.as_slice(), [NetworkRequest::LoadStreams { .. }]));
        let loads = app.on_streams_loaded(alpha(), items(&[A, B]));
        assert!(matches!(loads.as_slice(), [NetworkRequest::LoadEmbed { url }] if url == A));
        app
    }

    fn view(app: &App) -> &StreamViewState {
        app.state.stream.as_ref().expect("stream view open")
    }

    #[test]
    fn several_sources_prompt_and_prefetch() {
        let mut app = home_with(vec![alpha(), StreamSource::new("bravo", "2")]);
        let requests = app.open_selected_match(Instant::now());
        assert!(matches!(requests.as_slice(), [NetworkRequest::PrefetchLanguages { sources }] if sources.len() == 2));
        assert_eq!(view(&app).overlay, Some(Overlay::SourcePicker { selected: 0 }));
        assert_eq!(app.state.active_tab, MenuItem::Stream);

        app.picker_move(true);
        app.picker_move(true);
        let request = app.picker_confirm();
        assert!(matches!(request, Some(NetworkRequest::LoadStreams { source }) if source.source == "bravo"));
        assert!(view(&app).overlay.is_none());
    }

    #[test]
    fn no_sources_means_no_stream() {
        let mut app = home_with(Vec::new());
        assert!(app.open_selected_match(Instant::now()).is_empty());
        assert_eq!(view(&app).status.as_deref(), Some(NO_STREAM));
    }

    #[test]
    fn load_error_fails_over_then_exhausts() {
        let now = Instant::now();
        let mut app = playing(now);

        let events = vec![HostEvent::LoadError { host: Some("a.example".into()), main_frame: true }];
        let next = app.on_embed_loaded(A.into(), events, now);
        assert!(matches!(next.as_slice(), [NetworkRequest::LoadEmbed { url }] if url == B));

        let events = vec![HostEvent::LoadError { host: Some("b.example".into()), main_frame: true }];
        assert!(app.on_embed_loaded(B.into(), events, now).is_empty());
        assert_eq!(view(&app).status.as_deref(), Some(NO_STREAM));
    }

    #[test]
    fn stale_embed_results_are_dropped() {
        let now = Instant::now();
        let mut app = playing(now);
        let events = vec![HostEvent::LoadError { host: Some("b.example".into()), main_frame: true }];
        assert!(app.on_embed_loaded(B.into(), events, now).is_empty());
        assert_eq!(view(&app).session.controller.current_index(), 0);
    }

    #[test]
    fn foreign_host_navigation_is_blocked_with_notice() {
        let now = Instant::now();
        let mut app = playing(now);
        let events = vec![
            HostEvent::NavigationAttempt { host: Some("ads.example".into()) },
            HostEvent::Progress(100),
        ];
        assert!(app.on_embed_loaded(A.into(), events, now).is_empty());
        assert_eq!(app.visible_notice(now), Some("Blocked navigation to ads.example"));
        assert!(!view(&app).is_loading());
    }

    #[test]
    fn back_from_fullscreen_only_exits_fullscreen() {
        let now = Instant::now();
        let mut app = playing(now);
        app.toggle_fullscreen(now);
        assert!(view(&app).session.chrome.is_fullscreen());

        app.back(now);
        assert!(app.state.stream.is_some());
        assert!(!view(&app).session.controller.is_fullscreen());
        assert!(matches!(view(&app).session.chrome, ChromeState::Normal(_)));

        app.back(now);
        assert!(app.state.stream.is_none());
        assert_eq!(app.state.active_tab, MenuItem::Home);
    }

    #[test]
    fn duplicate_fullscreen_enter_is_ignored() {
        let now = Instant::now();
        let mut app = playing(now);
        app.on_host_event(HostEvent::FullscreenEntered, now);
        let later = now + Duration::from_secs(60);
        app.on_host_event(HostEvent::FullscreenEntered, later);
        assert!(matches!(view(&app).session.chrome, ChromeState::Fullscreen(_)));

        app.on_host_event(HostEvent::FullscreenExited, later);
        assert!(matches!(view(&app).session.chrome, ChromeState::Normal(_)));
        assert!(app.on_leave(later + Duration::from_secs(1)).is_some());
    }

    #[test]
    fn reopening_restores_source_and_embed() {
        let now = Instant::now();
        let mut app = playing(now);
        app.skip_embed();
        app.back(now);
        assert_eq!(app.state.snapshots["m1"].embed_index, 1);

        app.open_selected_match(now);
        let loads = app.on_streams_loaded(alpha(), items(&[A, B]));
        assert!(matches!(loads.as_slice(), [NetworkRequest::LoadEmbed { url }] if url == B));
    }

    #[test]
    fn leave_triggers_pip_only_near_fullscreen() {
        let now = Instant::now();
        let mut app = playing(now);
        assert!(app.on_leave(now).is_none());

        app.toggle_fullscreen(now);
        let request = app.on_leave(now).expect("eligible while fullscreen");
        assert_eq!(request.trigger, PipTrigger::LeaveHint);
        assert_eq!(request.fallback_url.as_deref(), Some(A));

        app.toggle_fullscreen(now);
        assert!(app.on_leave(now + Duration::from_secs(2)).is_some());
        assert!(app.on_leave(now + Duration::from_secs(6)).is_none());
    }

    #[test]
    fn explicit_pip_outside_fullscreen_only_hints() {
        let now = Instant::now();
        let mut app = playing(now);
        assert!(app.request_pip(now).is_none());
        assert!(app.visible_notice(now).is_some());

        app.toggle_fullscreen(now);
        let request = app.request_pip(now).expect("fullscreen request");
        assert_eq!(request.trigger, PipTrigger::UserRequest);
    }

    #[test]
    fn pip_decisions_drive_chrome_and_prompts() {
        let now = Instant::now();
        let mut app = playing(now);
        app.toggle_fullscreen(now);

        app.on_pip_decided("m1", PipTrigger::LeaveHint, PipDecision::NativePip { aspect: (16, 9) }, now);
        assert!(view(&app).session.chrome.is_native_pip());

        app.on_focus_gained(now);
        assert!(!view(&app).session.chrome.is_native_pip());
        assert!(view(&app).session.chrome.is_fullscreen());

        app.on_pip_decided("m1", PipTrigger::UserRequest, PipDecision::OfferBrowser { url: A.into() }, now);
        assert_eq!(view(&app).overlay, Some(Overlay::ConfirmBrowser { url: A.into() }));
        assert_eq!(app.confirm_browser(true).as_deref(), Some(A));
        assert!(view(&app).overlay.is_none());
    }

    #[test]
    fn browser_prompt_can_be_declined() {
        let now = Instant::now();
        let mut app = playing(now);
        app.offer_browser(now);
        assert_eq!(app.confirm_browser(false), None);
        assert!(view(&app).overlay.is_none());
    }

    #[test]
    fn resize_updates_orientation_for_new_sessions() {
        let now = Instant::now();
        let mut app = home_with(vec![alpha()]);
        app.on_resize(200, 50, now);
        app.open_selected_match(now);
        assert!(matches!(view(&app).session.chrome, ChromeState::Normal(Orientation::Landscape)));

        app.on_resize(80, 50, now);
        assert!(matches!(view(&app).session.chrome, ChromeState::Normal(Orientation::Portrait)));
    }

    #[test]
    fn failed_stream_lookup_shows_no_stream() {
        let now = Instant::now();
        let mut app = home_with(vec![alpha()]);
        app.open_selected_match(now);
        app.on_streams_failed(StreamSource::new("zulu", "9"), "boom".into());
        assert!(view(&app).status.is_none());

        app.on_streams_failed(alpha(), "boom".into());
        assert_eq!(view(&app).status.as_deref(), Some(NO_STREAM));
        assert!(!view(&app).is_loading());
    }

    fn section_with(ids: &[&str]) -> RankedSection {
        RankedSection {
            sport_id: "football".into(),
            sport_name: "Football".into(),
            matches: ids
                .iter()
                .map(|id| RankedMatch::new(Match { id: id.to_string(), sources: vec![alpha()], ..Default::default() }, 0))
                .collect(),
        }
    }

    #[test]
    fn failed_refresh_keeps_loaded_sections() {
        let mut app = home_with(vec![alpha()]);
        app.on_refresh_failed("API error for /api/sports: 403 Forbidden".into());

        assert_eq!(app.state.home.sections.len(), 1);
        assert_eq!(app.state.home.selected_match().map(|m| m.record.id.as_str()), Some("m1"));
        assert_eq!(app.state.last_error.as_deref(), Some("API error for /api/sports: 403 Forbidden"));

        app.on_sections_loaded(vec![section_with(&["m1"])]);
        assert!(app.state.last_error.is_none());
    }

    #[test]
    fn late_pip_decision_for_another_match_is_dropped() {
        let now = Instant::now();
        let mut app = playing(now);
        app.toggle_fullscreen(now);
        let request = app.on_leave(now).expect("eligible while fullscreen");
        assert_eq!(request.match_id, "m1");

        app.back(now);
        app.back(now);
        app.open_session(
            "m2".into(),
            LaunchParams { match_title: "C vs D".into(), source_key: None, source_id: None, sources: vec![alpha()] },
            now,
        );
        app.on_streams_loaded(alpha(), items(&[A]));
        app.toggle_fullscreen(now);

        app.on_pip_decided(&request.match_id, request.trigger, PipDecision::NativePip { aspect: (16, 9) }, now);
        assert!(!view(&app).session.chrome.is_native_pip());
        app.on_pip_decided(&request.match_id, request.trigger, PipDecision::OfferBrowser { url: A.into() }, now);
        assert!(view(&app).overlay.is_none());

        app.on_pip_decided("m2", PipTrigger::LeaveHint, PipDecision::NativePip { aspect: (16, 9) }, now);
        assert!(view(&app).session.chrome.is_native_pip());
    }

    #[test]
    fn snapshots_of_delisted_matches_are_pruned() {
        let now = Instant::now();
        let mut app = playing(now);
        app.back(now);
        assert!(app.state.snapshots.contains_key("m1"));

        app.on_sections_loaded(vec![section_with(&["m1", "m2"])]);
        assert!(app.state.snapshots.contains_key("m1"));

        app.on_sections_loaded(vec![section_with(&["m2"])]);
        assert!(app.state.snapshots.is_empty());
    }
}
