use crate::ranking::DEFAULT_PRIORITY_SPORTS;
use log::LevelFilter;
use std::str::FromStr;
use std::time::Duration;
use streamed_api::client::DEFAULT_BASE_URL;

const DEFAULT_PIP_GRACE_MS: u64 = 5_000;
const DEFAULT_PIP_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_REFRESH_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: Option<LevelFilter>,
    pub api_base: String,
    pub priority_sports: Vec<String>,
    /// How long after leaving fullscreen a leave signal still counts for PiP.
    pub pip_grace: Duration,
    pub pip_timeout: Duration,
    /// `None` turns periodic refresh off.
    pub refresh_interval: Option<Duration>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            full_screen: false,
            log_level: None,
            api_base: DEFAULT_BASE_URL.to_string(),
            priority_sports: DEFAULT_PRIORITY_SPORTS.iter().map(ToString::to_string).collect(),
            pip_grace: Duration::from_millis(DEFAULT_PIP_GRACE_MS),
            pip_timeout: Duration::from_millis(DEFAULT_PIP_TIMEOUT_MS),
            refresh_interval: Some(Duration::from_secs(DEFAULT_REFRESH_SECS)),
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset, blank or unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Self::default();

        if let Some(base) = get("STREAMER_API_BASE") {
            settings.api_base = base;
        }
        settings.log_level = get("STREAMER_LOG_LEVEL").and_then(|v| LevelFilter::from_str(&v).ok());
        if let Some(keys) = get("STREAMER_PRIORITY_SPORTS") {
            let keys: Vec<String> = keys
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect();
            if !keys.is_empty() {
                settings.priority_sports = keys;
            }
        }
        if let Some(ms) = get("STREAMER_PIP_GRACE_MS").and_then(|v| v.parse::<u64>().ok()) {
            settings.pip_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = get("STREAMER_PIP_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            settings.pip_timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = get("STREAMER_REFRESH_SECS").and_then(|v| v.parse::<u64>().ok()) {
            settings.refresh_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> AppSettings {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let s = settings(&[]);
        assert_eq!(s.api_base, DEFAULT_BASE_URL);
        assert_eq!(s.priority_sports, ["football", "american-football", "basketball"]);
        assert_eq!(s.pip_grace, Duration::from_secs(5));
        assert_eq!(s.refresh_interval, Some(Duration::from_secs(60)));
        assert!(s.log_level.is_none());
    }

    #[test]
    fn env_overrides() {
        let s = settings(&[
            ("STREAMER_API_BASE", "http://localhost:8080"),
            ("STREAMER_LOG_LEVEL", "debug"),
            ("STREAMER_PRIORITY_SPORTS", "tennis, ,darts"),
            ("STREAMER_PIP_GRACE_MS", "2500"),
            ("STREAMER_REFRESH_SECS", "0"),
        ]);
        assert_eq!(s.api_base, "http://localhost:8080");
        assert_eq!(s.log_level, Some(LevelFilter::Debug));
        assert_eq!(s.priority_sports, ["tennis", "darts"]);
        assert_eq!(s.pip_grace, Duration::from_millis(2500));
        assert_eq!(s.refresh_interval, None);
    }

    #[test]
    fn garbage_keeps_defaults() {
        let s = settings(&[("STREAMER_PIP_GRACE_MS", "soon"), ("STREAMER_LOG_LEVEL", "loud")]);
        assert_eq!(s.pip_grace, Duration::from_secs(5));
        assert!(s.log_level.is_none());
    }
}
