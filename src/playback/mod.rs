pub mod chrome;
pub mod controller;
pub mod pip;
pub mod session;

pub use chrome::{ChromeEvent, ChromeLayout, ChromeState, Orientation};
pub use controller::{PlaybackController, PlaybackStep};
pub use pip::{PipDecision, PipTrigger, ScriptHost};
pub use session::{LaunchParams, PlaybackSession, SessionSnapshot, SessionStart};
