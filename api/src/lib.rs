pub mod client;
pub mod wire;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;

pub use client::{ApiError, ApiResult, StreamedApi};

// ---------------------------------------------------------------------------
// Domain types, independent of the wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sport {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Match {
    pub id: String,
    pub title: String,
    pub category: String,
    /// Kickoff in epoch milliseconds. 0 means the provider did not say.
    pub date: i64,
    pub poster: Option<String>,
    pub popular: bool,
    pub teams: Option<Teams>,
    pub sources: Vec<StreamSource>,
    /// Never trusted from the per-sport listing; set from the live id set.
    pub is_live: bool,
}

impl Match {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        if self.date <= 0 {
            return None;
        }
        DateTime::from_timestamp_millis(self.date)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Teams {
    pub home: Option<Team>,
    pub away: Option<Team>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Team {
    pub name: Option<String>,
    pub badge: Option<String>,
}

/// A provider + stream pair. Identity is `(source, id)`; `language` is display
/// metadata filled in after the streams have been probed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamSource {
    pub source: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl StreamSource {
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self { source: source.into(), id: id.into(), language: None }
    }

    /// `source:id`, used to key per-source metadata such as languages.
    pub fn key(&self) -> String {
        format!("{}:{}", self.source, self.id)
    }

    pub fn same_stream(&self, other: &StreamSource) -> bool {
        self.source == other.source && self.id == other.id
    }
}

impl PartialEq for StreamSource {
    fn eq(&self, other: &Self) -> bool {
        self.same_stream(other)
    }
}

impl Eq for StreamSource {}

/// One concrete playable embed returned when resolving a [`StreamSource`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamItem {
    pub id: String,
    pub stream_no: Option<u32>,
    pub language: Option<String>,
    pub hd: bool,
    pub embed_url: Option<String>,
    pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// Data source seam
// ---------------------------------------------------------------------------

/// Everything the ranking engine and the playback session need from upstream.
/// [`StreamedApi`] is the HTTP implementation; tests substitute fakes.
pub trait MatchDataSource: Send + Sync {
    fn list_sports(&self) -> impl Future<Output = ApiResult<Vec<Sport>>> + Send;

    /// Matches for one sport. `is_live` is always false here.
    fn list_matches_for_sport(
        &self,
        sport_id: &str,
    ) -> impl Future<Output = ApiResult<Vec<Match>>> + Send;

    fn list_live_match_ids(&self) -> impl Future<Output = ApiResult<HashSet<String>>> + Send;

    fn list_live_popular_matches(&self) -> impl Future<Output = ApiResult<Vec<Match>>> + Send;

    fn list_streams_for_source(
        &self,
        source: &str,
        id: &str,
    ) -> impl Future<Output = ApiResult<Vec<StreamItem>>> + Send;
}

/// Result of fetching an embed page once: where it ended up after redirects
/// and with what status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedProbe {
    pub final_url: String,
    pub final_host: Option<String>,
    pub status: u16,
}

impl EmbedProbe {
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// Loads an embed page the way a web content host would, without rendering it.
pub trait EmbedProber: Send + Sync {
    fn probe_embed(&self, url: &str) -> impl Future<Output = ApiResult<EmbedProbe>> + Send;
}
