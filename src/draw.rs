use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Tabs, Wrap};
use tui::{Frame, Terminal};

use crate::app::{App, MenuItem};
use crate::playback::chrome::SystemBars;
use crate::playback::session::format_source_label;
use crate::ranking::MatchStatus;
use crate::state::app_state::{Overlay, StreamViewState, match_time_label};
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use chrono::Local;
use log::error;
use std::time::Instant;
use streamed_api::{Match, Team};

static TABS: &[&str; 2] = &["Matches", "Stream"];

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);
    let now = Instant::now();

    let result = terminal.draw(|f| {
        // Immersive chrome hides the header along with the toolbar.
        let immersive = app
            .state
            .stream
            .as_ref()
            .filter(|_| app.state.active_tab == MenuItem::Stream)
            .is_some_and(|v| v.session.chrome.layout().system_bars == SystemBars::HiddenSwipeToReveal);
        let full_screen = app.settings.full_screen || immersive;
        layout.update(f.area(), full_screen, app.state.show_logs);

        if !full_screen {
            draw_tabs(f, layout.tab_bar, app);
        }

        match app.state.active_tab {
            MenuItem::Home => draw_home(f, layout.main, app),
            MenuItem::Stream => match app.state.stream.as_ref() {
                Some(view) => draw_stream(f, layout.main, view),
                None => draw_placeholder(f, layout.main, "No match open"),
            },
            MenuItem::Help => draw_placeholder(
                f,
                layout.main,
                "Matches: ←/→=sport  ↑/↓=match  Enter=watch  r=refresh  F=full screen\n\
                 Stream: s=source  n=next embed  r=reload  f=fullscreen  p=picture-in-picture  o=open in browser  Esc=back\n\
                 \"=logs  q=quit",
            ),
        }

        if let Some(logs) = layout.logs {
            draw_logs(f, logs);
        }
        if let Some(text) = app.visible_notice(now) {
            draw_notice(f, f.area(), text);
        }
        draw_loading_spinner(f, f.area(), full_screen, loading);
    });

    if let Err(e) = result {
        error!("draw failed: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Home => 0,
        MenuItem::Stream => 1,
        MenuItem::Help => match app.state.previous_tab {
            MenuItem::Stream => 1,
            _ => 0,
        },
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let status = match app.state.home.last_refreshed.as_deref() {
        Some(at) => format!("{at}  Help: ? "),
        None => "Help: ? ".to_string(),
    };
    let help = Paragraph::new(status)
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

fn draw_home(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Matches ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let home = &app.state.home;
    if home.sections.is_empty() {
        let msg = match app.state.last_error.as_deref() {
            Some(err) => format!("{err}\n\nPress r to retry"),
            None => "Loading matches...".to_string(),
        };
        f.render_widget(
            Paragraph::new(msg)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            inner,
        );
        return;
    }

    let [sports_bar, error_line, content] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .areas(inner);

    let sports: Vec<Line> = home
        .sections
        .iter()
        .map(|s| Line::from(format!("{} ({})", s.sport_name, s.matches.len())))
        .collect();
    f.render_widget(
        Tabs::new(sports)
            .select(home.selected_section)
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        sports_bar,
    );

    // A failed refresh keeps the previous sections on screen.
    if let Some(err) = app.state.last_error.as_deref() {
        f.render_widget(Paragraph::new(err).style(Style::default().fg(Color::Red)), error_line);
    }

    let Some(section) = home.selected_section() else {
        return;
    };

    let visible = content.height as usize;
    let skip = (home.selected_match + 1).saturating_sub(visible);
    let now = Local::now();
    let lines: Vec<Line> = section
        .matches
        .iter()
        .enumerate()
        .skip(skip)
        .take(visible)
        .map(|(idx, ranked)| {
            let selected = idx == home.selected_match;
            let marker = if selected { ">" } else { " " };
            let time = match_time_label(ranked, &now);
            let time_style = match ranked.status {
                MatchStatus::Live => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                MatchStatus::Upcoming => Style::default().fg(Color::Gray),
                MatchStatus::Done => Style::default().fg(Color::DarkGray),
            };
            let title_style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            let mut spans = vec![
                Span::raw(format!("{marker} ")),
                Span::styled(format!("{time:<18}"), time_style),
                Span::styled(match_title(&ranked.record), title_style),
            ];
            if ranked.record.popular {
                spans.push(Span::styled(" ★", Style::default().fg(Color::Yellow)));
            }
            if !ranked.record.sources.is_empty() {
                spans.push(Span::styled(
                    format!("  [{} src]", ranked.record.sources.len()),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Line::from(spans)
        })
        .collect();

    f.render_widget(Paragraph::new(lines), content);
}

/// Prefer "Home vs Away" when both teams are named.
fn match_title(m: &Match) -> String {
    let name = |team: Option<&Team>| team.and_then(|t| t.name.clone()).filter(|n| !n.trim().is_empty());
    let teams = m.teams.as_ref();
    match (
        name(teams.and_then(|t| t.home.as_ref())),
        name(teams.and_then(|t| t.away.as_ref())),
    ) {
        (Some(home), Some(away)) if m.title.trim().is_empty() => format!("{home} vs {away}"),
        _ if m.title.trim().is_empty() => "Untitled match".to_string(),
        _ => m.title.clone(),
    }
}

fn draw_stream(f: &mut Frame, area: Rect, view: &StreamViewState) {
    let chrome = view.session.chrome.layout();
    let title = format!(" {} ", view.session.match_title);
    let block = default_border(if view.session.chrome.is_fullscreen() { Color::Yellow } else { Color::White })
        .title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let [toolbar, player, controls] = Layout::vertical([
        Constraint::Length(if chrome.toolbar { 2 } else { 0 }),
        Constraint::Fill(1),
        Constraint::Length(if chrome.controls { 1 } else { 0 }),
    ])
    .areas(inner);

    if chrome.toolbar {
        let source = view.session.current_label().unwrap_or_else(|| "No source".to_string());
        let controller = &view.session.controller;
        let embed = match controller.current_host() {
            Some(host) => format!("embed {}/{}  {host}", controller.current_index() + 1, controller.candidates().len()),
            None => String::new(),
        };
        f.render_widget(
            Paragraph::new(vec![
                Line::from(vec![
                    Span::styled("Source: ", Style::default().fg(Color::Gray)),
                    Span::raw(source),
                ]),
                Line::from(Span::styled(embed, Style::default().fg(Color::DarkGray))),
            ]),
            toolbar,
        );
    }

    let body = if let Some(status) = view.status.as_deref() {
        Paragraph::new(status).style(Style::default().fg(Color::Red))
    } else if view.session.is_resolving() {
        Paragraph::new("Finding streams...").style(Style::default().fg(Color::DarkGray))
    } else if view.surface.is_loading() {
        Paragraph::new(format!("Loading embed... {}%", view.surface.progress()))
            .style(Style::default().fg(Color::DarkGray))
    } else if let Some(url) = view.surface.loaded_url() {
        let state = if view.session.chrome.is_native_pip() {
            "Playing picture-in-picture"
        } else {
            "Ready"
        };
        Paragraph::new(vec![
            Line::from(Span::styled(state, Style::default().fg(Color::Green))),
            Line::from(""),
            Line::from(Span::styled(url, Style::default().fg(Color::Gray))),
            Line::from(""),
            Line::from(Span::styled("Press o to watch in the browser", Style::default().fg(Color::DarkGray))),
        ])
    } else {
        Paragraph::new("Pick a source with s").style(Style::default().fg(Color::DarkGray))
    };
    f.render_widget(body.alignment(Alignment::Center).wrap(Wrap { trim: true }), player);

    if chrome.controls {
        f.render_widget(
            Paragraph::new("s=source  n=next  r=reload  f=fullscreen  p=PiP  o=browser  Esc=back")
                .style(Style::default().fg(Color::DarkGray)),
            controls,
        );
    }

    match &view.overlay {
        Some(Overlay::SourcePicker { selected }) => draw_source_picker(f, area, view, *selected),
        Some(Overlay::ConfirmBrowser { url }) => draw_confirm_browser(f, area, url),
        None => {}
    }
}

fn draw_source_picker(f: &mut Frame, area: Rect, view: &StreamViewState, selected: usize) {
    let sources = view.session.sources();
    let height = (sources.len() as u16 + 2).min(area.height);
    let popup = centered_rect(area, 40, height);
    let block = default_border(Color::Yellow).title(" Choose source ");
    let inner = block.inner(popup);
    f.render_widget(Clear, popup);
    f.render_widget(block, popup);

    let current = view.session.current_source();
    let lines: Vec<Line> = sources
        .iter()
        .enumerate()
        .map(|(idx, source)| {
            let marker = if current.is_some_and(|c| c.same_stream(source)) { "•" } else { " " };
            let style = if idx == selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(format!("{marker} {}", format_source_label(source)), style))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_confirm_browser(f: &mut Frame, area: Rect, url: &str) {
    let popup = centered_rect(area, 60, 6);
    let block = default_border(Color::Yellow).title(" Open in browser? ");
    let inner = block.inner(popup);
    f.render_widget(Clear, popup);
    f.render_widget(block, popup);
    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(url, Style::default().fg(Color::Gray))),
            Line::from(""),
            Line::from("y=open  n=cancel"),
        ])
        .wrap(Wrap { trim: true }),
        inner,
    );
}

fn draw_notice(f: &mut Frame, area: Rect, text: &str) {
    let width = (text.chars().count() as u16 + 4).min(area.width);
    let notice = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.bottom().saturating_sub(4),
        width,
        3,
    );
    f.render_widget(Clear, notice);
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(default_border(Color::Gray)),
        notice,
    );
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logs = tui_logger::TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Gray))
        .style_debug(Style::default().fg(Color::DarkGray));
    f.render_widget(logs, area);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn draw_placeholder(f: &mut Frame, area: Rect, msg: &str) {
    let block = default_border(Color::DarkGray);
    let inner = block.inner(area);
    f.render_widget(block, area);
    f.render_widget(
        Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        inner,
    );
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, full_screen: bool, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(20), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}
