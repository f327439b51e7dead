//! The terminal's stand-in for a web content host.
//!
//! Nothing is rendered: loading an embed means fetching it once through the
//! [`EmbedProber`](streamed_api::EmbedProber) and translating what came back
//! into the same events a browser view would report.

use crate::playback::PlaybackStep;
use crate::playback::controller::host_of;
use crate::playback::pip::{HostUnavailable, ScriptHost};
use streamed_api::{ApiResult, EmbedProbe};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    NavigationAttempt { host: Option<String> },
    LoadError { host: Option<String>, main_frame: bool },
    Progress(u8),
    FullscreenEntered,
    FullscreenExited,
}

/// What the surface currently shows.
#[derive(Debug, Clone, Default)]
pub struct EmbedSurface {
    loaded_url: Option<String>,
    progress: u8,
}

impl EmbedSurface {
    /// Apply a controller step. Returns the URL to fetch, if any; a newer
    /// load always replaces the one in flight.
    pub fn apply(&mut self, step: &PlaybackStep) -> Option<String> {
        match step {
            PlaybackStep::Load { url, .. } | PlaybackStep::Reload { url, .. } => {
                self.loaded_url = Some(url.clone());
                self.progress = 0;
                Some(url.clone())
            }
            PlaybackStep::NoStreamAvailable => {
                self.clear();
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.loaded_url = None;
        self.progress = 0;
    }

    pub fn loaded_url(&self) -> Option<&str> {
        self.loaded_url.as_deref()
    }

    pub fn set_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_loading(&self) -> bool {
        self.loaded_url.is_some() && self.progress < 100
    }

    /// Whether a probe result still belongs to what is on screen.
    pub fn is_current(&self, url: &str) -> bool {
        self.loaded_url.as_deref() == Some(url)
    }
}

/// Turn one probe of `requested` into host events. A redirect off the embed's
/// host is reported as a navigation attempt only, never as a load error, so a
/// foreign error page cannot bounce the controller into a reload loop.
pub fn probe_events(requested: &str, result: &ApiResult<EmbedProbe>) -> Vec<HostEvent> {
    let requested_host = host_of(requested);
    match result {
        Err(_) => vec![HostEvent::LoadError { host: requested_host, main_frame: true }],
        Ok(probe) if probe.final_host.is_some() && probe.final_host != requested_host => vec![
            HostEvent::NavigationAttempt { host: probe.final_host.clone() },
            HostEvent::Progress(100),
        ],
        Ok(probe) if probe.is_success() => vec![HostEvent::Progress(100)],
        Ok(_) => vec![HostEvent::LoadError { host: requested_host, main_frame: true }],
    }
}

/// Terminals cannot run page scripts, so every in-page PiP probe falls back.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalScripts;

impl ScriptHost for TerminalScripts {
    async fn evaluate_script(&self, _script: &str) -> Result<String, HostUnavailable> {
        Err(HostUnavailable("terminal surface has no script engine".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamed_api::ApiError;

    fn probe(host: &str, status: u16) -> ApiResult<EmbedProbe> {
        Ok(EmbedProbe {
            final_url: format!("https://{host}/x"),
            final_host: Some(host.to_string()),
            status,
        })
    }

    #[test]
    fn load_resets_progress_and_no_stream_clears() {
        let mut surface = EmbedSurface::default();
        let url = surface.apply(&PlaybackStep::Load { index: 0, url: "https://a.example/1".into() });
        assert_eq!(url.as_deref(), Some("https://a.example/1"));
        assert!(surface.is_loading());

        surface.set_progress(100);
        assert!(!surface.is_loading());

        assert_eq!(surface.apply(&PlaybackStep::NoStreamAvailable), None);
        assert_eq!(surface.loaded_url(), None);
        assert!(!surface.is_loading());
    }

    #[test]
    fn probe_outcomes_map_to_host_events() {
        let url = "https://a.example/1";
        assert_eq!(probe_events(url, &probe("a.example", 200)), vec![HostEvent::Progress(100)]);
        assert_eq!(
            probe_events(url, &probe("a.example", 502)),
            vec![HostEvent::LoadError { host: Some("a.example".into()), main_frame: true }]
        );
        assert_eq!(
            probe_events(url, &probe("ads.example", 500)),
            vec![
                HostEvent::NavigationAttempt { host: Some("ads.example".into()) },
                HostEvent::Progress(100)
            ]
        );
        assert_eq!(
            probe_events(url, &Err(ApiError::Other("refused".into()))),
            vec![HostEvent::LoadError { host: Some("a.example".into()), main_frame: true }]
        );
    }

    #[tokio::test]
    async fn terminal_has_no_script_engine() {
        assert!(TerminalScripts.evaluate_script("1").await.is_err());
    }
}
