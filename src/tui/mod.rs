mod bars;
mod help;
mod state;

use crate::cli::{build_config, Cli};
use crate::engine::{MAX_SPEED, MIN_SPEED};
use crate::model::{Algorithm, RunConfig, RunResult, RunState, SortEvent, SortOutcome};
use crate::orchestrator::{self, UiCommand, MAX_SIZE, MIN_SIZE};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::UiState;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const SIZE_STEP: usize = 5;
const SPEED_STEP: u8 = 5;

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure and task switching in the hot path.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SortEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let cfg = build_config(&args);

    // TUI runs in a dedicated thread so all drawing stays on one thread,
    // away from both the runtime and the sort task.
    let ui_cfg = cfg.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_cfg, event_rx, cmd_tx));

    let res = orchestrator::run_controller(cfg, args.start_on_launch, event_tx, cmd_rx).await;

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
pub fn run_threaded(
    cfg: RunConfig,
    mut event_rx: UnboundedReceiver<SortEvent>,
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
        algorithm: cfg.algorithm,
        speed: cfg.speed,
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(33);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        let mut disconnected = false;
        loop {
            match event_rx.try_recv() {
                Ok(ev) => apply_event(&mut state, ev),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        if disconnected {
            // Controller is gone; nothing left to drive the screen.
            break Ok(());
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut state, k) {
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyAction::Command(cmd) => {
                        let _ = cmd_tx.send(cmd);
                    }
                    KeyAction::None => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

#[derive(Debug)]
enum KeyAction {
    None,
    Quit,
    Command(UiCommand),
}

/// Map a key press to a controller command. Controls that are disabled in
/// the current run state produce no command.
fn handle_key(state: &mut UiState, k: KeyEvent) -> KeyAction {
    match (k.modifiers, k.code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => KeyAction::Quit,
        (_, KeyCode::Tab) => {
            state.tab = (state.tab + 1) % 2;
            KeyAction::None
        }
        (_, KeyCode::Char('?')) => {
            state.tab = 1;
            KeyAction::None
        }
        (_, KeyCode::Char('+')) | (_, KeyCode::Char('=')) => KeyAction::Command(
            UiCommand::SetSpeed(state.speed.saturating_add(SPEED_STEP).min(MAX_SPEED)),
        ),
        (_, KeyCode::Char('-')) => KeyAction::Command(UiCommand::SetSpeed(
            state.speed.saturating_sub(SPEED_STEP).max(MIN_SPEED),
        )),
        (_, KeyCode::Char('x')) | (_, KeyCode::Esc) if state.stop_enabled() => {
            KeyAction::Command(UiCommand::Stop)
        }
        _ if !state.controls_enabled() => KeyAction::None,
        (_, KeyCode::Char('g')) => KeyAction::Command(UiCommand::Generate),
        (_, KeyCode::Char('s')) | (_, KeyCode::Enter) => {
            KeyAction::Command(UiCommand::Start(state.algorithm))
        }
        (_, KeyCode::Char('a')) => {
            KeyAction::Command(UiCommand::SelectAlgorithm(state.algorithm.next()))
        }
        (_, KeyCode::Char(c @ '1'..='3')) => {
            let idx = usize::from(c as u8 - b'1');
            KeyAction::Command(UiCommand::SelectAlgorithm(Algorithm::ALL[idx]))
        }
        (_, KeyCode::Left) => KeyAction::Command(UiCommand::SetSize(
            state.size().saturating_sub(SIZE_STEP).max(MIN_SIZE),
        )),
        (_, KeyCode::Right) => KeyAction::Command(UiCommand::SetSize(
            (state.size() + SIZE_STEP).min(MAX_SIZE),
        )),
        _ => KeyAction::None,
    }
}

fn apply_event(state: &mut UiState, ev: SortEvent) {
    match ev {
        SortEvent::Generated { sequence } => {
            state.info = format!("Generated {} values", sequence.len());
            state.sequence = sequence;
            state.roles.clear();
            state.stats = Default::default();
            state.run_start = None;
        }
        SortEvent::Frame {
            sequence,
            step,
            stats,
        } => {
            state.sequence = sequence;
            state.roles = step.roles;
            state.stats = stats;
        }
        SortEvent::StateChanged { state: run_state } => {
            if run_state == RunState::Running {
                state.run_start = Some(Instant::now());
                state.stats = Default::default();
                state.roles.clear();
            }
            state.run_state = run_state;
        }
        SortEvent::SpeedChanged { speed } => state.speed = speed,
        SortEvent::AlgorithmChanged { algorithm } => {
            state.algorithm = algorithm;
            state.info = format!("Selected {}", algorithm.name());
        }
        SortEvent::Info(info) => state.info = info.to_message(),
        SortEvent::RunCompleted { result } => handle_run_completed(state, *result),
    }
}

fn handle_run_completed(state: &mut UiState, r: RunResult) {
    let processed = orchestrator::process_run_completion(&r);
    state.info = processed.headline;
    state.stats = r.stats;
    state.sequence.clone_from(&r.sequence);
    if r.outcome != SortOutcome::Completed {
        // Partial results are shown without highlights.
        state.roles.clear();
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Visualizer"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("sortviz"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_visualizer(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn card(title: &'static str, value: String, color: Color) -> Paragraph<'static> {
    Paragraph::new(Line::from(Span::styled(
        value,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .block(Block::default().borders(Borders::ALL).title(title))
}

fn control_style(enabled: bool) -> Style {
    if enabled {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn draw_visualizer(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Controls
                Constraint::Length(3), // Stats cards
                Constraint::Min(5),    // Bars
                Constraint::Length(3), // Legend
                Constraint::Length(4), // Status + description
            ]
            .as_ref(),
        )
        .split(area);

    let idle = state.controls_enabled();
    let controls = Line::from(vec![
        Span::styled("Algorithm: ", Style::default().fg(Color::Gray)),
        Span::styled(state.algorithm.name(), control_style(idle)),
        Span::raw("   "),
        Span::styled("Size: ", Style::default().fg(Color::Gray)),
        Span::styled(state.size().to_string(), control_style(idle)),
        Span::raw("   "),
        Span::styled("Speed: ", Style::default().fg(Color::Gray)),
        Span::styled(format!("{}%", state.speed), control_style(true)),
        Span::raw("   "),
        Span::styled("[g] Generate ", control_style(idle)),
        Span::styled("[s] Start ", control_style(idle)),
        Span::styled("[x] Stop", control_style(state.stop_enabled())),
    ]);
    f.render_widget(
        Paragraph::new(controls).block(Block::default().borders(Borders::ALL).title("Controls")),
        main[0],
    );

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ]
            .as_ref(),
        )
        .split(main[1]);
    f.render_widget(
        card("Comparisons", state.stats.comparisons.to_string(), Color::Red),
        cards[0],
    );
    f.render_widget(card("Swaps", state.stats.swaps.to_string(), Color::Yellow), cards[1]);
    f.render_widget(
        card("Time", format!("{:.3}s", state.elapsed_secs()), Color::Green),
        cards[2],
    );
    f.render_widget(
        card(
            "Time Complexity",
            state.algorithm.complexity().to_string(),
            Color::Cyan,
        ),
        cards[3],
    );

    let title = Line::from(vec![
        Span::raw(format!("{} ", state.algorithm.name())),
        Span::styled(
            format!("[{}]", state.run_state_label()),
            Style::default().fg(match state.run_state {
                RunState::Running => Color::Green,
                RunState::Cancelling => Color::Yellow,
                _ => Color::Gray,
            }),
        ),
    ]);
    bars::render_bars(f, main[2], &state.sequence, &state.roles, title);

    f.render_widget(
        Paragraph::new(bars::legend_line())
            .block(Block::default().borders(Borders::ALL).title("Legend")),
        main[3],
    );

    let status = vec![
        Line::from(state.info.clone()),
        Line::from(Span::styled(
            state.algorithm.description(),
            Style::default().fg(Color::Gray),
        )),
    ];
    f.render_widget(
        Paragraph::new(status)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Status")),
        main[4],
    );
}
