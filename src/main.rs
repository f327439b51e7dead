mod app;
mod draw;
mod keys;
mod playback;
mod ranking;
mod state;
mod surface;
mod ui;

use crate::app::{App, PipRequest};
use crate::playback::pip::negotiate;
use crate::ranking::RankingEngine;
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use crate::state::refresher::PeriodicRefresher;
use crate::surface::TerminalScripts;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use log::{error, warn};
use std::io::Stdout;
use std::sync::Arc;
use std::time::Instant;
use std::{io, panic};
use streamed_api::StreamedApi;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Duration;
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if handle_cli_args() {
        return Ok(());
    }

    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal()?;

    tui_logger::init_logger(log::LevelFilter::Trace)?;
    tui_logger::set_default_level(log::LevelFilter::Warn);

    let app = App::new();
    let client = StreamedApi::with_base_url(app.settings.api_base.clone());
    let engine = RankingEngine::new(app.settings.priority_sports.clone());
    let refresh_interval = app.settings.refresh_interval;
    let app = Arc::new(Mutex::new(app));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Network thread
    let network_worker = NetworkWorker::new(client, engine, network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Periodic section refresh thread
    let periodic_task = refresh_interval.map(|period| {
        let periodic_updater = PeriodicRefresher::new(network_req_tx.clone(), period);
        tokio::spawn(periodic_updater.run())
    });

    // Load sections on startup
    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(
        terminal,
        app,
        ui_event_tx,
        ui_event_rx,
        network_req_tx,
        network_resp_rx,
    )
    .await;

    input_handler.abort();
    network_task.abort();
    if let Some(task) = periodic_task {
        task.abort();
    }

    cleanup_terminal();
    Ok(())
}

fn handle_cli_args() -> bool {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return false;
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            true
        }
        "-V" | "--version" => {
            println!("streamer {}", env!("CARGO_PKG_VERSION"));
            true
        }
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "streamer - live sports matches and stream embeds in the terminal

Usage:
  streamer
  streamer --help
  streamer --version

Environment:
  STREAMER_API_BASE         Match data API base URL (default https://streamed.pk)
  STREAMER_LOG_LEVEL        error | warn | info | debug | trace
  STREAMER_PRIORITY_SPORTS  Comma-separated sports shown first (default football,american-football,basketball)
  STREAMER_PIP_GRACE_MS     How long after fullscreen leaving still starts PiP (default 5000)
  STREAMER_PIP_TIMEOUT_MS   In-page PiP probe timeout (default 3000)
  STREAMER_REFRESH_SECS     Match list refresh interval, 0 disables (default 60)"
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    ui_event_tx: mpsc::Sender<UiEvent>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests, &ui_event_tx).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw =
                    handle_network_response(response, &app, &network_requests, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            else => break,
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    ui_events: &mpsc::Sender<UiEvent>,
) -> bool {
    let now = Instant::now();
    match ui_event {
        UiEvent::AppStarted => {
            let _ = network_requests.send(NetworkRequest::RefreshSections).await;
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests, ui_events).await;
            true
        }
        UiEvent::Resize(width, height) => {
            app.lock().await.on_resize(width, height, now);
            true
        }
        UiEvent::FocusLost => {
            let mut guard = app.lock().await;
            if let Some(request) = guard.on_leave(now) {
                spawn_pip_negotiation(request, guard.settings.pip_timeout, ui_events.clone());
            }
            false
        }
        UiEvent::FocusGained => {
            app.lock().await.on_focus_gained(now);
            true
        }
        UiEvent::PipDecided { match_id, trigger, decision } => {
            app.lock().await.on_pip_decided(&match_id, trigger, decision, now);
            true
        }
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    loading: &mut LoadingState,
) -> bool {
    let now = Instant::now();
    let follow_ups = {
        let mut guard = app.lock().await;
        match response {
            NetworkResponse::LoadingStateChanged { loading_state } => {
                *loading = loading_state;
                return true;
            }
            NetworkResponse::SectionsLoaded { sections } => {
                guard.on_sections_loaded(sections);
                Vec::new()
            }
            NetworkResponse::RefreshFailed { message } => {
                error!("Refresh failed: {message}");
                guard.on_refresh_failed(message);
                Vec::new()
            }
            NetworkResponse::StreamsLoaded { source, streams } => guard.on_streams_loaded(source, streams),
            NetworkResponse::StreamsFailed { source, message } => {
                guard.on_streams_failed(source, message);
                Vec::new()
            }
            NetworkResponse::SourceLanguages { languages } => {
                guard.on_source_languages(languages);
                Vec::new()
            }
            NetworkResponse::EmbedLoaded { url, events } => guard.on_embed_loaded(url, events, now),
        }
    };

    for request in follow_ups {
        let _ = network_requests.send(request).await;
    }
    !loading.is_loading
}

/// The probe may wait on the page for a while; its decision comes back as a
/// UI event so the loop stays the only writer.
pub fn spawn_pip_negotiation(request: PipRequest, timeout: Duration, ui_events: mpsc::Sender<UiEvent>) {
    tokio::spawn(async move {
        let PipRequest { match_id, trigger, fallback_url } = request;
        let decision = negotiate(&TerminalScripts, trigger, fallback_url, timeout).await;
        if ui_events.send(UiEvent::PipDecided { match_id, trigger, decision }).await.is_err() {
            warn!("PiP decision dropped, UI loop gone");
        }
    });
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        let Ok(event) = tokio::task::spawn_blocking(crossterm_event::read).await else {
            break;
        };
        if let Ok(event) = event {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(width, height) => Some(UiEvent::Resize(width, height)),
                Event::FocusLost => Some(UiEvent::FocusLost),
                Event::FocusGained => Some(UiEvent::FocusGained),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide)?;
    execute!(stdout, terminal::EnterAlternateScreen)?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    execute!(stdout, crossterm_event::EnableFocusChange)?;
    terminal::enable_raw_mode()
}

pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, crossterm_event::DisableFocusChange);
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
