use crate::wire::{MatchDto, SportDto, StreamDto};
use crate::{EmbedProbe, EmbedProber, Match, MatchDataSource, Sport, StreamItem, StreamSource, Team, Teams};
use reqwest::Client;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const DEFAULT_BASE_URL: &str = "https://streamed.pk";

/// Match data client backed by the streamed JSON API.
#[derive(Debug, Clone)]
pub struct StreamedApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for StreamedApi {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    NotFound(String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl StreamedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .user_agent(concat!("streamer/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_sports(&self) -> ApiResult<Vec<Sport>> {
        let url = format!("{}/api/sports", self.base_url);
        let raw: Vec<SportDto> = self.get_required(&url).await?;
        Ok(raw.into_iter().map(map_sport).collect())
    }

    pub async fn fetch_matches_for_sport(&self, sport_id: &str) -> ApiResult<Vec<Match>> {
        if sport_id.trim().is_empty() {
            return Err(ApiError::NotFound("empty sport id".into()));
        }
        let url = format!("{}/api/matches/{sport_id}", self.base_url);
        let raw: Vec<MatchDto> = self.get(&url).await?;
        Ok(raw.into_iter().map(map_match).collect())
    }

    pub async fn fetch_live_matches(&self) -> ApiResult<Vec<Match>> {
        let url = format!("{}/api/matches/live", self.base_url);
        let raw: Vec<MatchDto> = self.get_required(&url).await?;
        Ok(raw
            .into_iter()
            .map(|dto| Match { is_live: true, ..map_match(dto) })
            .collect())
    }

    pub async fn fetch_live_popular_matches(&self) -> ApiResult<Vec<Match>> {
        let url = format!("{}/api/matches/live/popular", self.base_url);
        let raw: Vec<MatchDto> = self.get_required(&url).await?;
        Ok(raw
            .into_iter()
            .map(|dto| Match { is_live: true, ..map_match(dto) })
            .collect())
    }

    pub async fn fetch_streams(&self, source: &str, id: &str) -> ApiResult<Vec<StreamItem>> {
        let url = format!("{}/api/stream/{source}/{id}", self.base_url);
        let raw: Vec<StreamDto> = self.get(&url).await?;
        Ok(raw.into_iter().map(map_stream).collect())
    }

    /// A 4xx decodes as an empty result; the caller degrades to "nothing here".
    async fn get<T: Default + serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        self.fetch(url, true).await
    }

    /// Every error status is an `ApiError::Api`.
    async fn get_required<T: Default + serde::de::DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        self.fetch(url, false).await
    }

    async fn fetch<T: Default + serde::de::DeserializeOwned>(
        &self,
        url: &str,
        client_error_is_empty: bool,
    ) -> ApiResult<T> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        match response.error_for_status() {
            Ok(res) => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Parsing(e, url.to_owned())),
            Err(e) => {
                let is_client_error = e.status().map(|s| s.is_client_error()).unwrap_or(false);
                if client_error_is_empty && is_client_error {
                    Ok(T::default())
                } else {
                    Err(ApiError::Api(e, url.to_owned()))
                }
            }
        }
    }
}

impl MatchDataSource for StreamedApi {
    async fn list_sports(&self) -> ApiResult<Vec<Sport>> {
        self.fetch_sports().await
    }

    async fn list_matches_for_sport(&self, sport_id: &str) -> ApiResult<Vec<Match>> {
        self.fetch_matches_for_sport(sport_id).await
    }

    async fn list_live_match_ids(&self) -> ApiResult<HashSet<String>> {
        let live = self.fetch_live_matches().await?;
        Ok(live.into_iter().map(|m| m.id).collect())
    }

    async fn list_live_popular_matches(&self) -> ApiResult<Vec<Match>> {
        self.fetch_live_popular_matches().await
    }

    async fn list_streams_for_source(&self, source: &str, id: &str) -> ApiResult<Vec<StreamItem>> {
        self.fetch_streams(source, id).await
    }
}

impl EmbedProber for StreamedApi {
    /// Error statuses come back as a probe, not an `Err`; only transport
    /// failures are errors.
    async fn probe_embed(&self, url: &str) -> ApiResult<EmbedProbe> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        let final_url = response.url();
        Ok(EmbedProbe {
            final_url: final_url.to_string(),
            final_host: final_url.host_str().map(str::to_ascii_lowercase),
            status: response.status().as_u16(),
        })
    }
}

// ---------------------------------------------------------------------------
// Mapping: wire types → clean domain types
// ---------------------------------------------------------------------------

fn map_sport(dto: SportDto) -> Sport {
    Sport { id: dto.id, name: dto.name }
}

fn map_match(dto: MatchDto) -> Match {
    Match {
        id: dto.id,
        title: dto.title,
        category: dto.category,
        date: dto.date.max(0),
        poster: dto.poster.filter(|p| !p.trim().is_empty()),
        popular: dto.popular,
        teams: dto.teams.map(|t| Teams {
            home: t.home.map(|h| Team { name: h.name, badge: h.badge }),
            away: t.away.map(|a| Team { name: a.name, badge: a.badge }),
        }),
        sources: dto
            .sources
            .into_iter()
            .map(|s| StreamSource::new(s.source, s.id))
            .collect(),
        is_live: false,
    }
}

fn map_stream(dto: StreamDto) -> StreamItem {
    StreamItem {
        id: dto.id,
        stream_no: dto.stream_no,
        language: dto.language,
        hd: dto.hd,
        embed_url: dto.embed_url,
        source: dto.source,
    }
}
