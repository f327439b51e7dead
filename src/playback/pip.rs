use log::{debug, warn};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Looks for the page's own `<video>` and asks it for picture-in-picture.
/// Resolves to one of the strings understood by [`PipOutcome::parse`].
pub const PIP_PROBE_SCRIPT: &str = r#"(function() {
    try {
        const video = document.querySelector('video');
        if (!video) return 'no-video';
        if (video.disablePictureInPicture) return 'disabled';
        if (!document.pictureInPictureEnabled) return 'not-enabled';
        return video.requestPictureInPicture()
            .then(() => 'ok')
            .catch(e => 'err:' + (e && e.message ? e.message : 'fail'));
    } catch (e) {
        return 'exception';
    }
})();"#;

/// Native PiP window shape.
pub const NATIVE_PIP_ASPECT: (u32, u32) = (16, 9);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipOutcome {
    Ok,
    NoVideo,
    NotEnabled,
    Disabled,
    Err(String),
    Exception,
}

impl PipOutcome {
    /// Hosts usually hand back a JSON-encoded string, so surrounding quotes
    /// are stripped. Anything outside the probe's vocabulary is an error.
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim().trim_matches('"');
        match value {
            "ok" => PipOutcome::Ok,
            "no-video" => PipOutcome::NoVideo,
            "not-enabled" => PipOutcome::NotEnabled,
            "disabled" => PipOutcome::Disabled,
            "exception" => PipOutcome::Exception,
            _ => match value.strip_prefix("err:") {
                Some(reason) => PipOutcome::Err(reason.to_string()),
                None => PipOutcome::Err(format!("unrecognized probe result {value:?}")),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, PipOutcome::Ok)
    }
}

impl fmt::Display for PipOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipOutcome::Ok => write!(f, "ok"),
            PipOutcome::NoVideo => write!(f, "no-video"),
            PipOutcome::NotEnabled => write!(f, "not-enabled"),
            PipOutcome::Disabled => write!(f, "disabled"),
            PipOutcome::Err(reason) => write!(f, "err:{reason}"),
            PipOutcome::Exception => write!(f, "exception"),
        }
    }
}

/// The hosting surface could not run the probe at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostUnavailable(pub String);

impl fmt::Display for HostUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script host unavailable: {}", self.0)
    }
}

/// The script-evaluation half of a web content host.
pub trait ScriptHost: Send + Sync {
    fn evaluate_script(
        &self,
        script: &str,
    ) -> impl Future<Output = Result<String, HostUnavailable>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipTrigger {
    /// The viewer is leaving the app (home gesture, app switch).
    LeaveHint,
    /// The viewer pressed the PiP control.
    UserRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipDecision {
    /// The page's own video went picture-in-picture; nothing else to do.
    InPage,
    /// Enter the shell's native PiP mode with the given aspect ratio.
    NativePip { aspect: (u32, u32) },
    /// Ask the viewer whether to open the embed in an external browser.
    OfferBrowser { url: String },
    /// Nothing to hand off; show a short notice instead.
    Notice(String),
}

/// Runs the in-page probe and picks the fallback for the trigger.
/// A leave signal falls back to native PiP; an explicit request never does and
/// offers the browser handoff instead.
pub async fn negotiate<H: ScriptHost>(
    host: &H,
    trigger: PipTrigger,
    fallback_url: Option<String>,
    timeout: Duration,
) -> PipDecision {
    let outcome = match tokio::time::timeout(timeout, host.evaluate_script(PIP_PROBE_SCRIPT)).await {
        Ok(Ok(raw)) => Some(PipOutcome::parse(&raw)),
        Ok(Err(e)) => {
            warn!("in-page PiP not attempted: {e}");
            None
        }
        Err(_) => {
            warn!("in-page PiP probe timed out after {}ms", timeout.as_millis());
            Some(PipOutcome::Err("timeout".into()))
        }
    };
    debug!("in-page PiP outcome={outcome:?} trigger={trigger:?}");

    if outcome.as_ref().is_some_and(PipOutcome::is_ok) {
        return PipDecision::InPage;
    }

    match trigger {
        PipTrigger::LeaveHint => PipDecision::NativePip { aspect: NATIVE_PIP_ASPECT },
        PipTrigger::UserRequest => match fallback_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => PipDecision::OfferBrowser { url },
            None => PipDecision::Notice("No stream available".into()),
        },
    }
}
