/// Raw wire types for the streamed match API.
/// Missing fields fall back to the documented defaults: `date` 0, `popular`
/// false, `sources` empty, booleans false.
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Matches  (api/matches/{sport}, api/matches/live, api/matches/live/popular)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct MatchDto {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub popular: bool,
    #[serde(default)]
    pub teams: Option<TeamsDto>,
    #[serde(default)]
    pub sources: Vec<SourceDto>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TeamsDto {
    #[serde(default)]
    pub home: Option<TeamDto>,
    #[serde(default)]
    pub away: Option<TeamDto>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TeamDto {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub badge: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SourceDto {
    pub source: String,
    pub id: String,
}

// ---------------------------------------------------------------------------
// Streams  (api/stream/{source}/{id})
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StreamDto {
    pub id: String,
    #[serde(default)]
    pub stream_no: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub hd: bool,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// Sports  (api/sports)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SportDto {
    pub id: String,
    pub name: String,
}
