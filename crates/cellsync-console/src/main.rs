mod app;
mod chat;
mod cli;
mod config;
mod dispatch;
mod events;
mod poller;
mod theme;
mod ui;
mod view;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use cellsync_core::{ControlPlane, HttpControlPlane};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::OpenOptions,
    io,
    sync::{Arc, Mutex},
};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::chat::ChatSession;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::events::ConsoleEvent;
use crate::view::ViewModel;

const EVENT_QUEUE_CAPACITY: usize = 256;

type ConsoleTerminal = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let headless = cli.command.is_some();
    init_logging(headless);

    let config = config::load(&cli.overrides())?;
    let plane: Arc<dyn ControlPlane> = Arc::new(
        HttpControlPlane::with_timeout(&config.backend_url, config.request_timeout)
            .context("failed to build http client")?,
    );

    match cli.command {
        Some(command) => {
            let mut stdout = io::stdout();
            cli::run(command, plane, &mut stdout).await
        }
        None => run_dashboard(config, plane).await,
    }
}

fn init_logging(headless: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if headless {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
        return;
    }

    let log_file = std::env::var("CELLSYNC_LOG_FILE")
        .ok()
        .filter(|path| !path.trim().is_empty())
        .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok());
    match log_file {
        Some(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}

async fn run_dashboard(config: Config, plane: Arc<dyn ControlPlane>) -> Result<()> {
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let poller = poller::spawn(plane.clone(), event_tx.clone(), config.poll_interval);
    let dispatcher = Dispatcher::new(plane.clone(), poller.trigger());
    let chat = ChatSession::new(plane, event_tx);
    let mut app = App::new(
        ViewModel::new(&config.greeting),
        dispatcher,
        chat,
        config.backend_url.clone(),
    );
    info!(event = "dashboard_started", backend = %config.backend_url);

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, &mut app, event_rx).await;
    app.teardown();
    poller.shutdown();
    restore_terminal(&mut terminal)?;
    info!(event = "dashboard_stopped");
    result
}

fn setup_terminal() -> Result<ConsoleTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut ConsoleTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_loop(
    terminal: &mut ConsoleTerminal,
    app: &mut App,
    mut event_rx: mpsc::Receiver<ConsoleEvent>,
) -> Result<()> {
    let mut input = EventStream::new();

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        tokio::select! {
            Some(event) = event_rx.recv() => {
                app.apply_event(event);
            }
            maybe_event = input.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                            app.handle_key(key);
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err).context("terminal input failed"),
                    None => break,
                }
            }
        }
        if app.should_quit() {
            break;
        }
    }
    Ok(())
}
