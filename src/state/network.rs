use crate::playback::session::language_label;
use crate::ranking::RankingEngine;
use crate::state::messages::{NetworkRequest, NetworkResponse};
use crate::surface::probe_events;
use chrono::Utc;
use futures_util::future::join_all;
use log::{debug, error};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use streamed_api::{EmbedProber, MatchDataSource, StreamSource, StreamedApi};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

/// Spinner frames while any request is in flight. Each request holds a
/// [`SpinnerGuard`]; the spinner settles once the last guard is released.
#[derive(Clone)]
struct Spinner {
    responses: mpsc::Sender<NetworkResponse>,
    in_flight: Arc<AtomicUsize>,
}

impl Spinner {
    fn new(responses: mpsc::Sender<NetworkResponse>) -> Self {
        Self { responses, in_flight: Arc::new(AtomicUsize::new(0)) }
    }

    async fn start(&self) -> SpinnerGuard {
        let guard = SpinnerGuard { spinner: self.clone(), released: false };
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            return guard;
        }

        let mut loading_state = LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let in_flight = self.in_flight.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if in_flight.load(Ordering::SeqCst) == 0 {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
        guard
    }

    /// True when this was the last request in flight.
    fn release(&self) -> bool {
        self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1
    }
}

fn idle_state(is_ok: bool) -> NetworkResponse {
    let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
    NetworkResponse::LoadingStateChanged {
        loading_state: LoadingState { is_loading: false, spinner_char },
    }
}

/// Dropping an unreleased guard, e.g. when its task is aborted, still counts
/// the request as finished.
struct SpinnerGuard {
    spinner: Spinner,
    released: bool,
}

impl SpinnerGuard {
    async fn stop(mut self, is_ok: bool) {
        self.released = true;
        if !self.spinner.release() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(15)).await;
        let _ = self.spinner.responses.send(idle_state(is_ok)).await;
    }
}

impl Drop for SpinnerGuard {
    fn drop(&mut self) {
        if !self.released && self.spinner.release() {
            let _ = self.spinner.responses.try_send(idle_state(true));
        }
    }
}

/// Owns the data source. Never touches UI state: every result goes back over
/// `responses` and is applied by the UI loop, which is the only writer.
pub struct NetworkWorker<S = StreamedApi> {
    client: S,
    engine: RankingEngine,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    spinner: Spinner,
    refresh_task: Option<JoinHandle<()>>,
    embed_task: Option<JoinHandle<()>>,
}

impl<S> NetworkWorker<S>
where
    S: MatchDataSource + EmbedProber + Clone + 'static,
{
    pub fn new(
        client: S,
        engine: RankingEngine,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        let spinner = Spinner::new(responses.clone());
        Self { client, engine, requests, responses, spinner, refresh_task: None, embed_task: None }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            match request {
                NetworkRequest::RefreshSections => self.spawn_refresh(),
                NetworkRequest::LoadStreams { source } => {
                    if !self.handle_load_streams(source).await {
                        break;
                    }
                }
                NetworkRequest::PrefetchLanguages { sources } => self.spawn_language_prefetch(sources),
                NetworkRequest::LoadEmbed { url } => self.spawn_embed_load(url),
            }
        }
        for task in [self.refresh_task.take(), self.embed_task.take()].into_iter().flatten() {
            task.abort();
        }
    }

    /// A newer refresh cancels the one still in flight.
    fn spawn_refresh(&mut self) {
        if let Some(previous) = self.refresh_task.take()
            && !previous.is_finished()
        {
            debug!("superseding in-flight refresh");
            previous.abort();
        }

        let client = self.client.clone();
        let engine = self.engine.clone();
        let responses = self.responses.clone();
        let spinner = self.spinner.clone();

        self.refresh_task = Some(tokio::spawn(async move {
            let loading = spinner.start().await;
            let result = engine.refresh(&client, Utc::now().timestamp_millis()).await;
            loading.stop(result.is_ok()).await;

            let response = match result {
                Ok(sections) => NetworkResponse::SectionsLoaded { sections },
                Err(e) => NetworkResponse::RefreshFailed { message: e.to_string() },
            };
            if let Err(e) = responses.send(response).await {
                error!("Failed to send refresh result: {e}");
            }
        }));
    }

    /// The web host is serial: a new load aborts the previous one.
    fn spawn_embed_load(&mut self, url: String) {
        if let Some(previous) = self.embed_task.take() {
            previous.abort();
        }

        let client = self.client.clone();
        let responses = self.responses.clone();

        self.embed_task = Some(tokio::spawn(async move {
            debug!("loading embed {url}");
            let result = client.probe_embed(&url).await;
            if let Err(e) = &result {
                debug!("embed load failed: {e}");
            }
            let events = probe_events(&url, &result);
            let _ = responses.send(NetworkResponse::EmbedLoaded { url, events }).await;
        }));
    }

    /// Returns false once the UI side has gone away.
    async fn handle_load_streams(&self, source: StreamSource) -> bool {
        debug!("resolving streams for {}", source.key());
        let loading = self.spinner.start().await;
        let result = self.client.list_streams_for_source(&source.source, &source.id).await;
        loading.stop(result.is_ok()).await;

        let response = match result {
            Ok(streams) => NetworkResponse::StreamsLoaded { source, streams },
            Err(e) => NetworkResponse::StreamsFailed { source, message: e.to_string() },
        };
        if let Err(e) = self.responses.send(response).await {
            error!("Failed to send network response: {e}");
            return false;
        }
        true
    }

    /// Per-source failures are silent; only languages that resolved are sent.
    fn spawn_language_prefetch(&self, sources: Vec<StreamSource>) {
        let client = self.client.clone();
        let responses = self.responses.clone();

        tokio::spawn(async move {
            let lookups = sources.iter().map(|source| {
                let client = &client;
                async move {
                    match client.list_streams_for_source(&source.source, &source.id).await {
                        Ok(streams) => language_label(&streams).map(|label| (source.key(), label)),
                        Err(e) => {
                            debug!("language prefetch failed for {}: {e}", source.key());
                            None
                        }
                    }
                }
            });
            let languages: HashMap<String, String> = join_all(lookups).await.into_iter().flatten().collect();
            if !languages.is_empty() {
                let _ = responses.send(NetworkResponse::SourceLanguages { languages }).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use crate::surface::HostEvent;
    use streamed_api::{ApiError, ApiResult, EmbedProbe, Match, Sport, StreamItem};

    /// The first sports call stalls, later ones answer at once.
    #[derive(Clone, Default)]
    struct SlowFirstSource {
        sports_calls: Arc<AtomicUsize>,
    }

    impl MatchDataSource for SlowFirstSource {
        async fn list_sports(&self) -> ApiResult<Vec<Sport>> {
            let call = self.sports_calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Ok(vec![Sport { id: "football".into(), name: format!("Football #{call}") }])
        }

        async fn list_matches_for_sport(&self, _: &str) -> ApiResult<Vec<Match>> {
            Ok(vec![Match { id: "m".into(), title: "M".into(), ..Default::default() }])
        }

        async fn list_live_match_ids(&self) -> ApiResult<HashSet<String>> {
            Ok(HashSet::new())
        }

        async fn list_live_popular_matches(&self) -> ApiResult<Vec<Match>> {
            Ok(Vec::new())
        }

        async fn list_streams_for_source(&self, source: &str, id: &str) -> ApiResult<Vec<StreamItem>> {
            match source {
                "alpha" => Ok(vec![StreamItem {
                    id: id.into(),
                    language: Some("English".into()),
                    embed_url: Some("https://a.example/1".into()),
                    ..Default::default()
                }]),
                "bravo" => Ok(vec![StreamItem { id: id.into(), ..Default::default() }]),
                _ => Err(ApiError::Other("down".into())),
            }
        }
    }

    impl EmbedProber for SlowFirstSource {
        async fn probe_embed(&self, url: &str) -> ApiResult<EmbedProbe> {
            if url.contains("slow") {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Ok(EmbedProbe {
                final_url: url.to_string(),
                final_host: Some("a.example".into()),
                status: 200,
            })
        }
    }

    fn spawn_worker(
        source: SlowFirstSource,
    ) -> (mpsc::Sender<NetworkRequest>, mpsc::Receiver<NetworkResponse>) {
        let (req_tx, req_rx) = mpsc::channel(16);
        let (resp_tx, resp_rx) = mpsc::channel(256);
        let worker = NetworkWorker::new(source, RankingEngine::default(), req_rx, resp_tx);
        tokio::spawn(worker.run());
        (req_tx, resp_rx)
    }

    async fn next_non_spinner(rx: &mut mpsc::Receiver<NetworkResponse>) -> NetworkResponse {
        loop {
            match rx.recv().await.expect("worker hung up") {
                NetworkResponse::LoadingStateChanged { .. } => continue,
                other => return other,
            }
        }
    }

    #[tokio::test]
    async fn newer_refresh_cancels_older() {
        let (tx, mut rx) = spawn_worker(SlowFirstSource::default());
        tx.send(NetworkRequest::RefreshSections).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(NetworkRequest::RefreshSections).await.unwrap();

        let NetworkResponse::SectionsLoaded { sections } = next_non_spinner(&mut rx).await else {
            panic!("expected sections");
        };
        assert_eq!(sections[0].sport_name, "Football #1");

        let late = tokio::time::timeout(Duration::from_millis(700), next_non_spinner(&mut rx)).await;
        assert!(late.is_err(), "superseded refresh still delivered");
    }

    #[tokio::test]
    async fn newer_embed_load_supersedes_older() {
        let (tx, mut rx) = spawn_worker(SlowFirstSource::default());
        tx.send(NetworkRequest::LoadEmbed { url: "https://a.example/slow".into() }).await.unwrap();
        tx.send(NetworkRequest::LoadEmbed { url: "https://a.example/fast".into() }).await.unwrap();

        let NetworkResponse::EmbedLoaded { url, events } = next_non_spinner(&mut rx).await else {
            panic!("expected embed load");
        };
        assert_eq!(url, "https://a.example/fast");
        assert_eq!(events, vec![HostEvent::Progress(100)]);

        let late = tokio::time::timeout(Duration::from_millis(700), next_non_spinner(&mut rx)).await;
        assert!(late.is_err(), "superseded embed load still delivered");
    }

    #[tokio::test]
    async fn stream_failures_are_reported_per_source() {
        let (tx, mut rx) = spawn_worker(SlowFirstSource::default());
        tx.send(NetworkRequest::LoadStreams { source: StreamSource::new("zulu", "1") }).await.unwrap();

        let NetworkResponse::StreamsFailed { source, message } = next_non_spinner(&mut rx).await else {
            panic!("expected failure");
        };
        assert_eq!(source, StreamSource::new("zulu", "1"));
        assert!(message.contains("down"));
    }

    #[tokio::test]
    async fn language_prefetch_skips_failures_and_unlabelled() {
        let (tx, mut rx) = spawn_worker(SlowFirstSource::default());
        let sources = vec![
            StreamSource::new("alpha", "1"),
            StreamSource::new("bravo", "2"),
            StreamSource::new("zulu", "3"),
        ];
        tx.send(NetworkRequest::PrefetchLanguages { sources }).await.unwrap();

        let NetworkResponse::SourceLanguages { languages } = next_non_spinner(&mut rx).await else {
            panic!("expected languages");
        };
        assert_eq!(languages, HashMap::from([("alpha:1".to_string(), "English".to_string())]));
    }

    fn spinner_state(response: &NetworkResponse) -> Option<bool> {
        match response {
            NetworkResponse::LoadingStateChanged { loading_state } => Some(loading_state.is_loading),
            _ => None,
        }
    }

    #[tokio::test]
    async fn spinner_keeps_running_until_last_request_finishes() {
        let (tx, mut rx) = spawn_worker(SlowFirstSource::default());
        tx.send(NetworkRequest::RefreshSections).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(NetworkRequest::LoadStreams { source: StreamSource::new("zulu", "1") }).await.unwrap();

        assert!(matches!(next_non_spinner(&mut rx).await, NetworkResponse::StreamsFailed { .. }));
        let next = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await.unwrap().unwrap();
        assert_eq!(spinner_state(&next), Some(true), "stream lookup stopped the refresh spinner");

        let mut last_spinner = None;
        loop {
            let response = rx.recv().await.unwrap();
            if let Some(state) = spinner_state(&response) {
                last_spinner = Some(state);
            } else {
                assert!(matches!(response, NetworkResponse::SectionsLoaded { .. }));
                break;
            }
        }
        assert_eq!(last_spinner, Some(false));
    }

    #[tokio::test]
    async fn superseded_refresh_does_not_leave_spinner_running() {
        let (tx, mut rx) = spawn_worker(SlowFirstSource::default());
        tx.send(NetworkRequest::RefreshSections).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(NetworkRequest::RefreshSections).await.unwrap();

        assert!(matches!(next_non_spinner(&mut rx).await, NetworkResponse::SectionsLoaded { .. }));
        tokio::time::sleep(Duration::from_millis(150)).await;
        while let Ok(response) = rx.try_recv() {
            assert_ne!(spinner_state(&response), Some(true), "spinner still ticking");
        }
    }

    #[tokio::test]
    async fn forbidden_sports_endpoint_fails_the_refresh() {
        let mut server = mockito::Server::new_async().await;
        let _sports = server.mock("GET", "/api/sports").with_status(403).create_async().await;
        let _live = server.mock("GET", "/api/matches/live").with_status(200).with_body("[]").create_async().await;
        let _popular = server
            .mock("GET", "/api/matches/live/popular")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let (req_tx, req_rx) = mpsc::channel(16);
        let (resp_tx, mut resp_rx) = mpsc::channel(256);
        let client = StreamedApi::with_base_url(server.url());
        tokio::spawn(NetworkWorker::new(client, RankingEngine::default(), req_rx, resp_tx).run());
        req_tx.send(NetworkRequest::RefreshSections).await.unwrap();

        let NetworkResponse::RefreshFailed { message } = next_non_spinner(&mut resp_rx).await else {
            panic!("expected the refresh to fail");
        };
        assert!(message.contains("/api/sports"));
    }
}
