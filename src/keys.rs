use crate::app::{App, MenuItem};
use crate::state::app_state::Overlay;
use crate::state::messages::{NetworkRequest, UiEvent};
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    ui_events: &mpsc::Sender<UiEvent>,
) {
    let mut guard = app.lock().await;
    let now = Instant::now();
    let mut requests: Vec<NetworkRequest> = Vec::new();

    if let (Char('c'), KeyModifiers::CONTROL) = (key_event.code, key_event.modifiers) {
        crate::cleanup_terminal();
        std::process::exit(0);
    }

    // Any key while fullscreen counts as fullscreen activity for the PiP grace window.
    if let Some(view) = guard.state.stream.as_mut()
        && view.session.controller.is_fullscreen()
    {
        view.session.controller.mark_fullscreen_activity(now);
    }

    let overlay = guard.state.stream.as_ref().and_then(|v| v.overlay.clone());
    match (overlay, key_event.code) {
        (Some(Overlay::SourcePicker { .. }), Char('j') | KeyCode::Down) => guard.picker_move(true),
        (Some(Overlay::SourcePicker { .. }), Char('k') | KeyCode::Up) => guard.picker_move(false),
        (Some(Overlay::SourcePicker { .. }), KeyCode::Enter) => requests.extend(guard.picker_confirm()),
        (Some(Overlay::ConfirmBrowser { .. }), Char('y') | KeyCode::Enter) => {
            if let Some(url) = guard.confirm_browser(true)
                && let Err(e) = webbrowser::open(&url)
            {
                guard.on_browser_launch_failed(e.to_string(), now);
            }
        }
        (Some(Overlay::ConfirmBrowser { .. }), Char('n')) => {
            guard.confirm_browser(false);
        }
        (Some(_), KeyCode::Esc | KeyCode::Backspace) => guard.back(now),
        (Some(_), _) => {}

        (None, _) => match (guard.state.active_tab, key_event.code) {
            (_, Char('q')) => {
                crate::cleanup_terminal();
                std::process::exit(0);
            }
            (MenuItem::Help, KeyCode::Esc) => guard.exit_help(),
            (_, Char('?')) => guard.update_tab(MenuItem::Help),
            (_, Char('"')) => guard.toggle_show_logs(),

            // Home
            (MenuItem::Home, Char('l') | KeyCode::Right) => guard.next_section(),
            (MenuItem::Home, Char('h') | KeyCode::Left) => guard.prev_section(),
            (MenuItem::Home, Char('j') | KeyCode::Down) => guard.match_down(),
            (MenuItem::Home, Char('k') | KeyCode::Up) => guard.match_up(),
            (MenuItem::Home, KeyCode::Enter) => requests.extend(guard.open_selected_match(now)),
            (MenuItem::Home, Char('r')) => requests.push(NetworkRequest::RefreshSections),
            (MenuItem::Home, Char('F')) => guard.toggle_full_screen(),

            // Stream view
            (MenuItem::Stream, KeyCode::Esc | KeyCode::Backspace) => guard.back(now),
            (MenuItem::Stream, Char('s')) => guard.open_source_picker(),
            (MenuItem::Stream, Char('n')) => requests.extend(guard.skip_embed()),
            (MenuItem::Stream, Char('r')) => requests.extend(guard.reload_embed()),
            (MenuItem::Stream, Char('f')) => guard.toggle_fullscreen(now),
            (MenuItem::Stream, Char('o')) => guard.offer_browser(now),
            (MenuItem::Stream, Char('p')) => {
                if let Some(request) = guard.request_pip(now) {
                    crate::spawn_pip_negotiation(request, guard.settings.pip_timeout, ui_events.clone());
                }
            }

            _ => {}
        },
    }

    drop(guard);
    for request in requests {
        let _ = network_requests.send(request).await;
    }
}
