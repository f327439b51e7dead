//! Toolbar, controls and system-bar visibility as a small state machine.
//!
//! Transitions are pure: the caller feeds events and applies whatever layout
//! comes back. `None` means the event changes nothing visible.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Terminal cells are roughly twice as tall as wide, so a window counts as
    /// landscape once it is more than twice as many columns as rows.
    pub fn from_cells(width: u16, height: u16) -> Self {
        if u32::from(width) > u32::from(height) * 2 {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemBars {
    Visible,
    /// Hidden until the viewer swipes them back in.
    HiddenSwipeToReveal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromeLayout {
    pub toolbar: bool,
    pub controls: bool,
    pub system_bars: SystemBars,
}

impl ChromeLayout {
    pub fn for_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Portrait => ChromeLayout {
                toolbar: true,
                controls: true,
                system_bars: SystemBars::Visible,
            },
            Orientation::Landscape => ChromeLayout::immersive(),
        }
    }

    pub fn immersive() -> Self {
        ChromeLayout {
            toolbar: false,
            controls: false,
            system_bars: SystemBars::HiddenSwipeToReveal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeEvent {
    OrientationChanged(Orientation),
    FullscreenEntered,
    FullscreenExited,
    PipModeChanged(bool),
    /// The surface came back to the foreground and should re-assert its layout.
    Resumed,
}

/// The orientation carried by every state is the latest one reported, even
/// while it is being ignored, so leaving fullscreen or PiP lands on the
/// orientation the device is actually in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeState {
    Normal(Orientation),
    Fullscreen(Orientation),
    NativePip { orientation: Orientation, resume_fullscreen: bool },
}

impl Default for ChromeState {
    fn default() -> Self {
        ChromeState::Normal(Orientation::default())
    }
}

impl ChromeState {
    pub fn orientation(self) -> Orientation {
        match self {
            ChromeState::Normal(o) | ChromeState::Fullscreen(o) => o,
            ChromeState::NativePip { orientation, .. } => orientation,
        }
    }

    pub fn is_fullscreen(self) -> bool {
        matches!(
            self,
            ChromeState::Fullscreen(_) | ChromeState::NativePip { resume_fullscreen: true, .. }
        )
    }

    pub fn is_native_pip(self) -> bool {
        matches!(self, ChromeState::NativePip { .. })
    }

    /// What is on screen right now.
    pub fn layout(self) -> ChromeLayout {
        match self {
            ChromeState::Normal(o) => ChromeLayout::for_orientation(o),
            ChromeState::Fullscreen(_) | ChromeState::NativePip { .. } => ChromeLayout::immersive(),
        }
    }

    pub fn transition(self, event: ChromeEvent) -> (ChromeState, Option<ChromeLayout>) {
        use ChromeEvent::*;
        use ChromeState::*;

        match (self, event) {
            (Normal(_), OrientationChanged(o)) => (Normal(o), Some(ChromeLayout::for_orientation(o))),
            (Fullscreen(_), OrientationChanged(o)) => (Fullscreen(o), None),
            (NativePip { resume_fullscreen, .. }, OrientationChanged(o)) => {
                (NativePip { orientation: o, resume_fullscreen }, None)
            }

            (Normal(o), FullscreenEntered) => (Fullscreen(o), Some(ChromeLayout::immersive())),
            (Fullscreen(_), FullscreenEntered) => (self, None),
            (NativePip { orientation, .. }, FullscreenEntered) => {
                (NativePip { orientation, resume_fullscreen: true }, None)
            }

            (Fullscreen(o), FullscreenExited) => (Normal(o), Some(ChromeLayout::for_orientation(o))),
            (Normal(_), FullscreenExited) => (self, None),
            (NativePip { orientation, .. }, FullscreenExited) => {
                (NativePip { orientation, resume_fullscreen: false }, None)
            }

            (Normal(o), PipModeChanged(true)) => (
                NativePip { orientation: o, resume_fullscreen: false },
                Some(ChromeLayout::immersive()),
            ),
            (Fullscreen(o), PipModeChanged(true)) => {
                (NativePip { orientation: o, resume_fullscreen: true }, None)
            }
            (NativePip { orientation, resume_fullscreen: true }, PipModeChanged(false)) => {
                (Fullscreen(orientation), Some(ChromeLayout::immersive()))
            }
            (NativePip { orientation, resume_fullscreen: false }, PipModeChanged(false)) => {
                (Normal(orientation), Some(ChromeLayout::for_orientation(orientation)))
            }
            (_, PipModeChanged(_)) => (self, None),

            (Normal(o), Resumed) => (self, Some(ChromeLayout::for_orientation(o))),
            (_, Resumed) => (self, None),
        }
    }
}
