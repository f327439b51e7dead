use crate::playback::{PipDecision, PipTrigger};
use crate::ranking::RankedSection;
use crate::state::network::LoadingState;
use crate::surface::HostEvent;
use crossterm::event::KeyEvent;
use std::collections::HashMap;
use streamed_api::{StreamItem, StreamSource};

#[derive(Debug, Clone)]
pub enum NetworkRequest {
    RefreshSections,
    LoadStreams { source: StreamSource },
    /// Best effort: resolve every source once just to learn its languages.
    PrefetchLanguages { sources: Vec<StreamSource> },
    /// Fetch an embed page; replaces any load still in flight.
    LoadEmbed { url: String },
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    SectionsLoaded { sections: Vec<RankedSection> },
    RefreshFailed { message: String },
    StreamsLoaded { source: StreamSource, streams: Vec<StreamItem> },
    StreamsFailed { source: StreamSource, message: String },
    /// `source:id` → joined language label.
    SourceLanguages { languages: HashMap<String, String> },
    EmbedLoaded { url: String, events: Vec<HostEvent> },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize(u16, u16),
    /// The terminal lost focus: the viewer is leaving.
    FocusLost,
    FocusGained,
    AppStarted,
    PipDecided { match_id: String, trigger: PipTrigger, decision: PipDecision },
}
