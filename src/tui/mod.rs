mod charts;
mod export;
mod help;
mod state;

use crate::engine::{IntervalScheduler, RuntimeClock};
use crate::model::{RunConfig, RunPhase, TimerEvent};
use crate::orchestrator::{Controller, UiCommand};
use crate::storage::{FileStore, HistoryStore};
use crate::text_summary::{format_depth, format_time};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use export::{export_history_csv, export_history_json};
use help::draw_help;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{UiState, TAB_COUNT, TAB_DASHBOARD, TAB_HELP, TAB_HISTORY};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(cfg: RunConfig) -> Result<()> {
    // Unbounded channels avoid backpressure and task switching in the hot path.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<TimerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let kv = FileStore::new(&cfg.data_dir);
    let storage_path = kv.slot_path(&cfg.storage_key).display().to_string();
    let store = HistoryStore::open(kv, cfg.storage_key.clone());

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(storage_path, event_rx, cmd_tx));

    let controller = Controller::new(RuntimeClock, IntervalScheduler, store, cfg.tick_interval);
    let res = controller.run(event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    storage_path: String,
    mut event_rx: UnboundedReceiver<TimerEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        storage_path,
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal
                .draw(|f| {
                    state.history_page_rows = history_rows(content_area(f.area()));
                    draw(f.area(), f, &state)
                })
                .ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if state.rename_buffer.is_some() {
                    handle_rename_key(&mut state, k, &cmd_tx);
                    continue;
                }
                if handle_key(&mut state, k, &cmd_tx) == KeyOutcome::Quit {
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn handle_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) -> KeyOutcome {
    match (k.modifiers, k.code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            let _ = cmd_tx.send(UiCommand::Quit);
            return KeyOutcome::Quit;
        }
        (_, KeyCode::Char(' ')) | (_, KeyCode::Enter) => {
            if state.tab == TAB_DASHBOARD {
                let _ = cmd_tx.send(UiCommand::Toggle);
            }
        }
        (_, KeyCode::Tab) => {
            state.tab = (state.tab + 1) % TAB_COUNT;
            if state.tab == TAB_HISTORY {
                state.clamp_history_selection();
            }
        }
        (_, KeyCode::Char('?')) => {
            state.tab = TAB_HELP;
        }
        (_, KeyCode::Up) | (_, KeyCode::Char('k')) => {
            if state.tab == TAB_HISTORY && state.history_selected > 0 {
                state.history_selected -= 1;
                state.scroll_to_selection();
            }
        }
        (_, KeyCode::Down) | (_, KeyCode::Char('j')) => {
            if state.tab == TAB_HISTORY
                && state.history_selected < state.history.len().saturating_sub(1)
            {
                state.history_selected += 1;
                state.scroll_to_selection();
            }
        }
        (_, KeyCode::Char('n')) => {
            if state.tab == TAB_HISTORY {
                let current = state.selected_measurement().map(|m| m.name.clone());
                if let Some(name) = current {
                    state.rename_buffer = Some(name);
                    state.info = "Renaming: Enter to save, Esc to cancel".into();
                }
            }
        }
        (_, KeyCode::Char('d')) => {
            if state.tab == TAB_HISTORY && state.selected_measurement().is_some() {
                let _ = cmd_tx.send(UiCommand::Delete {
                    index: state.history_selected,
                });
                state.info = "Deleted".into();
            }
        }
        (_, KeyCode::Char('e')) => {
            if state.tab == TAB_HISTORY {
                state.info = match export_history_json(&state.history) {
                    Ok(p) => {
                        state.last_exported_path = Some(p.display().to_string());
                        format!("Exported JSON: {}", p.display())
                    }
                    Err(e) => format!("JSON export failed: {e:#}"),
                };
            }
        }
        (_, KeyCode::Char('c')) => {
            if state.tab == TAB_HISTORY {
                state.info = match export_history_csv(&state.history) {
                    Ok(p) => {
                        state.last_exported_path = Some(p.display().to_string());
                        format!("Exported CSV: {}", p.display())
                    }
                    Err(e) => format!("CSV export failed: {e:#}"),
                };
            }
        }
        _ => {}
    }
    KeyOutcome::Continue
}

fn handle_rename_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) {
    let Some(buffer) = state.rename_buffer.as_mut() else {
        return;
    };
    match k.code {
        KeyCode::Enter => {
            let name = std::mem::take(buffer);
            state.rename_buffer = None;
            let _ = cmd_tx.send(UiCommand::Rename {
                index: state.history_selected,
                name,
            });
            state.info = "Renamed".into();
        }
        KeyCode::Esc => {
            state.rename_buffer = None;
            state.info = "Rename cancelled".into();
        }
        KeyCode::Backspace => {
            buffer.pop();
        }
        KeyCode::Char(c) if !k.modifiers.contains(KeyModifiers::CONTROL) => buffer.push(c),
        _ => {}
    }
}

fn apply_event(state: &mut UiState, ev: TimerEvent) {
    match ev {
        TimerEvent::Started => {
            state.phase = RunPhase::Running;
            state.readout = None;
            state.run_points.clear();
            state.info = "Measuring...".into();
        }
        TimerEvent::Readout(sample) => {
            state.readout = Some(sample);
            UiState::push_point(&mut state.run_points, sample.elapsed_time, sample.depth);
        }
        TimerEvent::Stopped { readout, committed } => {
            state.phase = RunPhase::Idle;
            state.readout = readout;
            if let Some(m) = committed {
                state.info = format!(
                    "Recorded {:.2} m after {:.2} s",
                    m.depth, m.elapsed_time
                );
            }
        }
        TimerEvent::HistoryChanged { history } => {
            state.history = history;
            state.clamp_history_selection();
        }
        TimerEvent::Info(info) => state.info = info.to_message(),
    }
}

fn split_tabs(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area)
}

/// Area below the tab bar.
fn content_area(area: Rect) -> Rect {
    split_tabs(area)[1]
}

/// History rows that fit in `area`: borders, header and spacer lines excluded.
fn history_rows(area: Rect) -> usize {
    (area.height as usize).saturating_sub(7).max(1)
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = split_tabs(area);

    let tabs = Tabs::new(vec![
        Line::from("Dashboard"),
        Line::from("History"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("freefall-depth"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_DASHBOARD => draw_dashboard(chunks[1], f, state),
        TAB_HISTORY => draw_history(chunks[1], f, state),
        _ => draw_help(chunks[1], f, &state.storage_path),
    }
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(5), // Depth and time readouts
                Constraint::Length(3), // Start/Stop control + status
                Constraint::Min(8),    // Depth chart
                Constraint::Length(6), // How it works
            ]
            .as_ref(),
        )
        .split(area);

    let readout_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(main[0]);

    let big = Style::default()
        .fg(Color::White)
        .add_modifier(Modifier::BOLD);
    let depth = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(format_depth(state.readout), big)),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Depth(m)"));
    f.render_widget(depth, readout_row[0]);

    let time = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(format_time(state.readout), big)),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Time(s)"));
    f.render_widget(time, readout_row[1]);

    // Single control whose label follows the run state.
    let control_color = match state.phase {
        RunPhase::Idle => Color::Green,
        RunPhase::Running => Color::Red,
    };
    let status = Paragraph::new(Line::from(vec![
        Span::styled("[space] ", Style::default().fg(Color::Magenta)),
        Span::styled(
            state.phase.action_label(),
            Style::default()
                .fg(control_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled("Info: ", Style::default().fg(Color::Gray)),
        Span::raw(state.info.as_str()),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Control"));
    f.render_widget(status, main[1]);

    charts::render_depth_chart(f, main[2], &state.run_points);

    let how = Paragraph::new(vec![
        Line::from(vec![
            Span::raw("depth = acceleration due to gravity × time² / 2, with g = "),
            Span::styled(
                format!("{} m/s²", crate::physics::GRAVITY),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(
            "Time runs from the moment you press Start; depth is in meters and grows along a parabola.",
        ),
        Line::from("Drop a stone, start the clock, stop it when you hear the splash."),
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title("How it works"));
    f.render_widget(how, main[3]);
}

fn draw_history(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();

    let max_items = history_rows(area);

    let total_count = state.history.len();
    let current_pos = if total_count > 0 {
        state.history_selected + 1
    } else {
        0
    };

    lines.push(Line::from(vec![
        Span::raw(format!("History ({}/{}) - ", current_pos, total_count)),
        Span::styled("↑/↓/j/k", Style::default().fg(Color::Magenta)),
        Span::raw(": navigate, "),
        Span::styled("n", Style::default().fg(Color::Magenta)),
        Span::raw(": rename, "),
        Span::styled("d", Style::default().fg(Color::Magenta)),
        Span::raw(": delete, "),
        Span::styled("e", Style::default().fg(Color::Magenta)),
        Span::raw(": export JSON, "),
        Span::styled("c", Style::default().fg(Color::Magenta)),
        Span::raw(": export CSV"),
    ]));
    if !state.info.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Info: ", Style::default().fg(Color::Gray)),
            Span::raw(state.info.as_str()),
        ]));
    }
    if let Some(path) = state.last_exported_path.as_deref() {
        lines.push(Line::from(vec![
            Span::styled("Last export: ", Style::default().fg(Color::Gray)),
            Span::raw(path),
        ]));
    }
    lines.push(Line::from(""));

    if state.history.is_empty() {
        lines.push(Line::from("No measurements yet. Start one on the Dashboard."));
    } else {
        let name_width = state
            .history
            .iter()
            .map(|m| m.name.chars().count())
            .chain(state.rename_buffer.as_ref().map(|b| b.chars().count() + 1))
            .max()
            .unwrap_or(4)
            .clamp(4, 40);

        lines.push(Line::from(Span::styled(
            format!(
                "  {:>3}  {:<name_width$}  {:>10}  {:>9}",
                "#", "Name", "Depth (m)", "Time (s)"
            ),
            Style::default().fg(Color::Gray),
        )));

        // Keep the selected row visible.
        let scroll_offset = if state.history_selected < state.history_scroll_offset {
            state.history_selected
        } else if state.history_selected >= state.history_scroll_offset + max_items {
            state.history_selected.saturating_sub(max_items - 1)
        } else {
            state.history_scroll_offset
        };

        for (idx, m) in state
            .history
            .iter()
            .enumerate()
            .skip(scroll_offset)
            .take(max_items)
        {
            let is_selected = idx == state.history_selected;
            let name = match (&state.rename_buffer, is_selected) {
                (Some(buffer), true) => format!("{buffer}_"),
                _ => m.name.clone(),
            };
            let row = format!(
                "{} {:>3}  {:<name_width$}  {:>10.2}  {:>9.2}",
                if is_selected { ">" } else { " " },
                idx + 1,
                name,
                m.depth,
                m.elapsed_time
            );
            let style = if is_selected && state.rename_buffer.is_some() {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else if is_selected {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(row, style)));
        }
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("History"));
    f.render_widget(p, area);
}
