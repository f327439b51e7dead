use futures_util::future::join_all;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;
use streamed_api::{ApiError, Match, MatchDataSource, Sport};

/// Sports pulled to the front of the home screen, in this order.
pub const DEFAULT_PRIORITY_SPORTS: [&str; 3] = ["football", "american-football", "basketball"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    Live,
    Upcoming,
    Done,
}

impl MatchStatus {
    /// Live comes only from the live id set. Anything else with a known start
    /// time in the past has finished; unknown or future start times are upcoming.
    pub fn derive(m: &Match, now_ms: i64) -> Self {
        if m.is_live {
            MatchStatus::Live
        } else if m.date > 0 && m.date <= now_ms {
            MatchStatus::Done
        } else {
            MatchStatus::Upcoming
        }
    }

    fn priority(self) -> u8 {
        match self {
            MatchStatus::Live => 0,
            MatchStatus::Upcoming => 1,
            MatchStatus::Done => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchStatus::Live => "LIVE",
            MatchStatus::Upcoming => "",
            MatchStatus::Done => "DONE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatch {
    pub record: Match,
    pub status: MatchStatus,
}

impl RankedMatch {
    pub fn new(record: Match, now_ms: i64) -> Self {
        let status = MatchStatus::derive(&record, now_ms);
        Self { record, status }
    }

    fn time_key(&self) -> i64 {
        let time = self.record.date;
        match self.status {
            MatchStatus::Live => 0,
            MatchStatus::Upcoming if time > 0 => time,
            MatchStatus::Done if time > 0 => -time,
            _ => i64::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSection {
    pub sport_id: String,
    pub sport_name: String,
    pub matches: Vec<RankedMatch>,
}

#[derive(Debug)]
pub enum RefreshError {
    Sports(ApiError),
    LiveMatches(ApiError),
    LivePopular(ApiError),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshError::Sports(e) => write!(f, "Unable to load sports: {e}"),
            RefreshError::LiveMatches(e) => write!(f, "Unable to load live games: {e}"),
            RefreshError::LivePopular(e) => write!(f, "Unable to load popular games: {e}"),
        }
    }
}

impl std::error::Error for RefreshError {}

/// Lowercase, no spaces, no hyphens: "American Football" == "american-football".
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != ' ' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn sport_matches_key(sport: &Sport, normalized_key: &str) -> bool {
    normalize_key(&sport.id) == normalized_key || normalize_key(&sport.name) == normalized_key
}

/// Priority sports first (one per key, in key order), then everything else in
/// its original order. Sports sharing a normalized id appear once.
pub fn order_sports(sports: &[Sport], priority_keys: &[String]) -> Vec<Sport> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut ordered = Vec::with_capacity(sports.len());

    for key in priority_keys {
        let key = normalize_key(key);
        let Some(sport) = sports.iter().find(|s| sport_matches_key(s, &key)) else {
            continue;
        };
        if seen.insert(normalize_key(&sport.id)) {
            ordered.push(sport.clone());
        }
    }

    for sport in sports {
        if seen.insert(normalize_key(&sport.id)) {
            ordered.push(sport.clone());
        }
    }

    ordered
}

/// Sorted ascending by popular rank, popular flag, status, time, then title.
pub fn sort_matches(matches: &mut [RankedMatch], popular_order: &HashMap<String, usize>) {
    matches.sort_by(|a, b| {
        let key = |m: &RankedMatch| {
            (
                popular_order.get(&m.record.id).copied().unwrap_or(usize::MAX),
                !m.record.popular,
                m.status.priority(),
                m.time_key(),
            )
        };
        key(a).cmp(&key(b)).then_with(|| a.record.title.cmp(&b.record.title))
    });
}

/// Fetches, cross-references and orders everything the home screen shows.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    priority_keys: Vec<String>,
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY_SPORTS.iter().map(ToString::to_string).collect())
    }
}

impl RankingEngine {
    pub fn new(priority_keys: Vec<String>) -> Self {
        Self { priority_keys }
    }

    pub fn priority_keys(&self) -> &[String] {
        &self.priority_keys
    }

    /// Full rebuild. Sports and live data are required; a single sport failing
    /// only drops that sport's section.
    pub async fn refresh<S: MatchDataSource>(
        &self,
        source: &S,
        now_ms: i64,
    ) -> Result<Vec<RankedSection>, RefreshError> {
        let sports = source.list_sports().await.map_err(RefreshError::Sports)?;
        let popular = source
            .list_live_popular_matches()
            .await
            .map_err(RefreshError::LivePopular)?;
        let live_ids = source
            .list_live_match_ids()
            .await
            .map_err(RefreshError::LiveMatches)?;

        let popular_order: HashMap<String, usize> = popular
            .into_iter()
            .enumerate()
            .map(|(index, m)| (m.id, index))
            .collect();

        let ordered = order_sports(&sports, &self.priority_keys);
        debug!(
            "refreshing {} sports ({} live, {} popular)",
            ordered.len(),
            live_ids.len(),
            popular_order.len()
        );

        Ok(build_sections(source, &ordered, &live_ids, &popular_order, now_ms).await)
    }
}

/// One concurrent fetch per sport; sections come back in `ordered` order.
pub async fn build_sections<S: MatchDataSource>(
    source: &S,
    ordered: &[Sport],
    live_ids: &HashSet<String>,
    popular_order: &HashMap<String, usize>,
    now_ms: i64,
) -> Vec<RankedSection> {
    let fetches = ordered.iter().map(|sport| async move {
        let matches = match source.list_matches_for_sport(&sport.id).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!("skipping sport {}: {e}", sport.id);
                Vec::new()
            }
        };

        let mut ranked: Vec<RankedMatch> = matches
            .into_iter()
            .map(|mut m| {
                m.is_live = live_ids.contains(&m.id);
                RankedMatch::new(m, now_ms)
            })
            .collect();
        sort_matches(&mut ranked, popular_order);

        (!ranked.is_empty()).then(|| RankedSection {
            sport_id: sport.id.clone(),
            sport_name: sport.name.clone(),
            matches: ranked,
        })
    });

    join_all(fetches).await.into_iter().flatten().collect()
}
