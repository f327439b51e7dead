use crate::playback::chrome::{ChromeEvent, ChromeLayout, ChromeState};
use crate::playback::controller::{PlaybackController, PlaybackStep, embed_candidates};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use streamed_api::{StreamItem, StreamSource};

/// How a playback session is opened from the match list.
#[derive(Debug, Clone, Default)]
pub struct LaunchParams {
    pub match_title: String,
    pub source_key: Option<String>,
    pub source_id: Option<String>,
    pub sources: Vec<StreamSource>,
}

/// Just enough to put a session back where it was.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub source_key: Option<String>,
    pub source_id: Option<String>,
    #[serde(default)]
    pub embed_index: usize,
}

impl SessionSnapshot {
    fn source(&self) -> Option<StreamSource> {
        source_from_parts(self.source_key.as_deref(), self.source_id.as_deref())
    }
}

fn source_from_parts(key: Option<&str>, id: Option<&str>) -> Option<StreamSource> {
    match (key, id) {
        (Some(key), Some(id)) if !key.trim().is_empty() && !id.trim().is_empty() => {
            Some(StreamSource::new(key, id))
        }
        _ => None,
    }
}

/// Provider codes are phonetic letters; anything else is just capitalized.
pub fn format_source_name(raw: &str) -> String {
    let known = [
        "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "intel",
    ];
    let lower = raw.to_lowercase();
    if raw.is_empty() {
        return "Unknown".to_string();
    }
    let base = if known.contains(&lower.as_str()) { lower.as_str() } else { raw };
    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Unknown".to_string(),
    }
}

pub fn format_source_label(source: &StreamSource) -> String {
    let base = format_source_name(&source.source);
    match source.language.as_deref().map(str::trim) {
        Some(language) if !language.is_empty() => format!("{base} ({language})"),
        _ => base,
    }
}

/// Distinct non-blank languages joined for display, or `None` if there are none.
pub fn language_label(items: &[StreamItem]) -> Option<String> {
    let mut languages: Vec<&str> = Vec::new();
    for language in items.iter().filter_map(|i| i.language.as_deref()).map(str::trim) {
        if !language.is_empty() && !languages.contains(&language) {
            languages.push(language);
        }
    }
    (!languages.is_empty()).then(|| languages.join(", "))
}

/// What the session wants to happen right after it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStart {
    /// Resolve this source's streams.
    Resolve(StreamSource),
    /// Let the viewer pick among several sources first.
    PromptSource,
    NoStreamAvailable,
}

/// Everything one viewing of one match owns.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub match_title: String,
    sources: Vec<StreamSource>,
    current: Option<StreamSource>,
    pending_index: usize,
    resolving: bool,
    pub controller: PlaybackController,
    pub chrome: ChromeState,
}

impl PlaybackSession {
    /// An explicit source in the launch params wins over one from the
    /// snapshot; either is prepended when the source list lacks it. The
    /// snapshot's embed index is only honoured for the snapshot's own source.
    pub fn open(
        params: LaunchParams,
        snapshot: Option<&SessionSnapshot>,
        pip_grace: Duration,
    ) -> (Self, SessionStart) {
        let launch_source = source_from_parts(params.source_key.as_deref(), params.source_id.as_deref());
        let restored_source = snapshot.and_then(SessionSnapshot::source);
        let initial = launch_source.or_else(|| restored_source.clone());

        let mut sources = params.sources;
        if let Some(initial) = &initial
            && !sources.iter().any(|s| s.same_stream(initial))
        {
            sources.insert(0, initial.clone());
        }
        debug!("opening session: initial={initial:?}, sources={}", sources.len());

        let mut session = Self {
            match_title: params.match_title,
            sources,
            current: None,
            pending_index: 0,
            resolving: false,
            controller: PlaybackController::new(pip_grace),
            chrome: ChromeState::default(),
        };

        let start = if session.sources.is_empty() {
            SessionStart::NoStreamAvailable
        } else if let Some(initial) = initial {
            let index = match (&restored_source, snapshot) {
                (Some(restored), Some(snap)) if restored.same_stream(&initial) => snap.embed_index,
                _ => 0,
            };
            SessionStart::Resolve(session.select_source(initial, index))
        } else if session.sources.len() == 1 {
            let only = session.sources[0].clone();
            SessionStart::Resolve(session.select_source(only, 0))
        } else {
            SessionStart::PromptSource
        };
        (session, start)
    }

    pub fn sources(&self) -> &[StreamSource] {
        &self.sources
    }

    pub fn current_source(&self) -> Option<&StreamSource> {
        self.current.as_ref()
    }

    pub fn is_resolving(&self) -> bool {
        self.resolving
    }

    pub fn current_label(&self) -> Option<String> {
        self.current.as_ref().map(format_source_label)
    }

    /// Switch to `source` starting at `embed_index`; the caller resolves the
    /// returned source's streams.
    pub fn select_source(&mut self, source: StreamSource, embed_index: usize) -> StreamSource {
        let source = self
            .sources
            .iter()
            .find(|s| s.same_stream(&source))
            .cloned()
            .unwrap_or(source);
        debug!("selected source={}, id={}", source.source, source.id);
        self.controller.reset();
        self.pending_index = embed_index;
        self.resolving = true;
        self.current = Some(source.clone());
        source
    }

    /// Apply a stream lookup. Results for anything but the current source are
    /// stale and dropped (`None`).
    pub fn on_streams_resolved(&mut self, source: &StreamSource, items: &[StreamItem]) -> Option<PlaybackStep> {
        if !self.current.as_ref().is_some_and(|c| c.same_stream(source)) {
            debug!("dropping stale streams for {}", source.key());
            return None;
        }
        self.resolving = false;
        if let Some(label) = language_label(items) {
            self.set_language(source, label);
        }
        let candidates = embed_candidates(items);
        Some(self.controller.start(candidates, self.pending_index))
    }

    /// Failed lookup for the current source; stale failures are dropped.
    pub fn on_streams_failed(&mut self, source: &StreamSource) -> bool {
        if !self.current.as_ref().is_some_and(|c| c.same_stream(source)) {
            return false;
        }
        self.resolving = false;
        self.controller.reset();
        true
    }

    /// Merge prefetched `source:id → language` labels. Returns true if any
    /// label changed.
    pub fn apply_language_map(&mut self, languages: &HashMap<String, String>) -> bool {
        let mut changed = false;
        for source in &mut self.sources {
            let Some(language) = languages.get(&source.key()).map(|l| l.trim()) else {
                continue;
            };
            if !language.is_empty() && source.language.as_deref() != Some(language) {
                source.language = Some(language.to_string());
                changed = true;
            }
        }
        if changed && let Some(current) = self.current.take() {
            let updated = self.sources.iter().find(|s| s.same_stream(&current)).cloned();
            self.current = Some(updated.unwrap_or(current));
        }
        changed
    }

    fn set_language(&mut self, target: &StreamSource, label: String) {
        for source in self.sources.iter_mut().filter(|s| s.same_stream(target)) {
            source.language = Some(label.clone());
        }
        if let Some(current) = self.current.as_mut().filter(|c| c.same_stream(target)) {
            current.language = Some(label);
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            source_key: self.current.as_ref().map(|s| s.source.clone()),
            source_id: self.current.as_ref().map(|s| s.id.clone()),
            embed_index: self.controller.current_index(),
        }
    }

    /// Feed a chrome event and keep the controller's fullscreen flag in step.
    pub fn on_chrome_event(&mut self, event: ChromeEvent, now: std::time::Instant) -> Option<ChromeLayout> {
        match event {
            ChromeEvent::FullscreenEntered => {
                self.controller.enter_fullscreen(now);
            }
            ChromeEvent::FullscreenExited => {
                self.controller.exit_fullscreen();
            }
            _ => {}
        }
        let (next, layout) = self.chrome.transition(event);
        self.chrome = next;
        layout
    }
}
