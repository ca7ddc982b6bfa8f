mod app;
mod cli;
mod clusters;
mod config;
mod gate;
mod input;
mod resolver;
mod responses;
mod session;
mod toast;
mod transcript;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand};
use chrono::Local;
use clap::Parser;
use cli::CliArgs;
use clusters::{ClusterSize, ClusterStore, ExamTrack};
use config::LabConfig;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use gate::{ProcessingGate, ResolutionEvent};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

const MIN_TICK_MS: u64 = 50;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let config = LabConfig::load(&args)?;
    match &config.source {
        Some(source) => info!(config = %source, "loaded config"),
        None => debug!("no config file found, using defaults"),
    }
    debug!(
        responses = config.responses.entries().len(),
        "response table ready"
    );

    let launch_track = ExamTrack::from_token(&args.track).unwrap_or_else(|| {
        warn!(track = %args.track, "unknown track, falling back to CKAD");
        ExamTrack::Ckad
    });

    let launch_size = ClusterSize::from_token(&args.size).unwrap_or_else(|| {
        warn!(size = %args.size, "unknown cluster size, falling back to multi-node");
        ClusterSize::MultiNode
    });

    let mut app = App::new(&config, ClusterStore::seeded(Local::now()), launch_track)
        .with_launch_size(launch_size);
    if let Some(cluster) = args.cluster.as_deref()
        && !app.open_terminal(cluster)
    {
        warn!(cluster, status = app.status(), "could not open terminal at startup");
    }

    let (gate, resolutions) = ProcessingGate::new(config.latency);
    run(&mut app, &gate, resolutions, args.tick_ms.max(MIN_TICK_MS)).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // The TUI owns stdout, so logs go to a file or nowhere.
    let _ = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::sink).try_init(),
    };

    Ok(())
}

async fn run(
    app: &mut App,
    gate: &ProcessingGate,
    resolutions: mpsc::UnboundedReceiver<ResolutionEvent>,
    tick_ms: u64,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, gate, resolutions, tick_ms).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gate: &ProcessingGate,
    mut resolutions: mpsc::UnboundedReceiver<ResolutionEvent>,
    tick_ms: u64,
) -> Result<()> {
    let mut reader = EventStream::new();
    let mut ticker = interval(Duration::from_millis(tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!(latency = ?gate.latency(), tick_ms, "event loop started");

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.screen(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action, Instant::now());
                            execute_app_command(gate, command);
                        }
                    }
                    Some(Ok(Event::Resize(_, _))) => {}
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                app.tick(Instant::now());
            }
            maybe_resolution = resolutions.recv() => {
                if let Some(event) = maybe_resolution
                    && !app.on_resolved(event)
                {
                    debug!("dropped resolution for a closed or replaced session");
                }
            }
        }
    }

    Ok(())
}

fn execute_app_command(gate: &ProcessingGate, command: AppCommand) {
    match command {
        AppCommand::None => {}
        AppCommand::ScheduleResolution { session, pending } => {
            // Completion arrives on the resolution channel; the handle is not needed.
            drop(gate.schedule(session, pending));
        }
    }
}
