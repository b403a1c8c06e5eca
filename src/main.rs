mod api;
mod app;
mod config;
mod coordinator;
mod error;
mod events;
mod generation;
mod git;
mod models;
mod ui;

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    cursor::Show,
    event::{self, Event as CrosstermEvent, KeyEventKind},
    execute,
    style::Stylize,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use api::OllamaClient;
use app::App;
use coordinator::Coordinator;
use events::{Decision, Event};
use git::GitCli;
use ui::Theme;

const TICK_RATE: Duration = Duration::from_millis(80);

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(Some(output)) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", format!("{err:#}").red());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<Option<String>> {
    let mut config = config::load()?;
    if let Some(warning) = init_logging(config::get_config_dir().as_deref()) {
        config.warnings.push(warning);
    }

    for warning in &config.warnings {
        eprintln!("{}", warning.as_str().yellow());
    }

    let theme = Theme::from_config(&config.theme)?;
    let client = OllamaClient::new(&config.generation)?;
    client
        .heartbeat()
        .await
        .with_context(|| format!("could not reach {}", config.generation.endpoint))?;

    let repository = GitCli;
    let diff = coordinator::prepare_diff(&repository).await?;
    info!(diff_len = diff.len(), "staged diff loaded");

    let app = App::new(config.generation.keywords.clone());
    let committed = Coordinator::new(client, repository, config.generation, diff)
        .run(move |events, decisions, cancel| run_presentation(app, theme, events, decisions, cancel))
        .await?;

    Ok(committed)
}

/// Send tracing output to the log file; the terminal belongs to the UI.
///
/// A log file that cannot be opened disables logging and comes back as a
/// warning instead of stopping the program.
fn init_logging(config_dir: Option<&Path>) -> Option<String> {
    let dir = config_dir?;
    let file = match open_log_file(dir) {
        Ok(file) => file,
        Err(err) => return Some(format!("warning: logging disabled: {err:#}")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("QC_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    None
}

fn open_log_file(dir: &Path) -> Result<File> {
    fs::create_dir_all(dir).with_context(|| format!("could not create {}", dir.display()))?;

    let path = config::get_log_path(dir);
    File::create(&path).with_context(|| format!("could not open {}", path.display()))
}

/// Raw mode and the alternate screen, undone on drop so every exit path
/// (errors and panics included) gives the terminal back.
struct TerminalGuard {
    restore: fn(),
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = Self {
            restore: restore_terminal,
        };
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        (self.restore)();
    }
}

fn restore_terminal() {
    if let Err(err) = disable_raw_mode() {
        warn!(%err, "could not leave raw mode");
    }
    if let Err(err) = execute!(io::stdout(), LeaveAlternateScreen, Show) {
        warn!(%err, "could not leave the alternate screen");
    }
}

async fn run_presentation(
    mut app: App,
    theme: Theme,
    mut events: mpsc::Receiver<Event>,
    decisions: mpsc::Sender<Decision>,
    cancel: CancellationToken,
) -> Result<(), error::Error> {
    let _guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    run_app(&mut terminal, &mut app, &theme, &mut events, &decisions, &cancel).await
}

async fn run_app<B: Backend + Send>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    theme: &Theme,
    events: &mut mpsc::Receiver<Event>,
    decisions: &mpsc::Sender<Decision>,
    cancel: &CancellationToken,
) -> Result<(), error::Error> {
    let mut ticker = tokio::time::interval(TICK_RATE);

    loop {
        terminal.draw(|f| ui::render(f, app, theme))?;

        tokio::select! {
            () = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => {
                    debug!(kind = %event.kind(), "event received");
                    app.handle_event(event);
                }
                None => break,
            },
            _ = ticker.tick() => {
                app.tick();
                while !app.should_quit && event::poll(Duration::ZERO)? {
                    let CrosstermEvent::Key(key) = event::read()? else {
                        continue;
                    };
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if let Some(decision) = app.handle_key(key) {
                        debug!(?decision, "sending decision");
                        if !send_decision(decisions, decision, cancel).await {
                            return Ok(());
                        }
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

async fn send_decision(
    decisions: &mpsc::Sender<Decision>,
    decision: Decision,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        result = decisions.send(decision) => result.is_ok(),
    }
}
