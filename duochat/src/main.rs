//! `duochat`: terminal client for chat rooms.
//!
//! Connects to a chat server over WebSocket, uploads files over HTTP and
//! runs the TUI. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/duochat/config.toml`).
//!
//! ```bash
//! cargo run --bin duochat -- --server-url http://127.0.0.1:3000 --name Ada
//!
//! # Or via environment variables
//! DUOCHAT_SERVER_URL=http://127.0.0.1:3000 DUOCHAT_NAME=Ada cargo run
//! ```

use std::io;
use std::path::Path;
use std::time::Instant;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use duochat::app::App;
use duochat::chat::ChatClient;
use duochat::config::prefs::Preferences;
use duochat::config::{CliArgs, ClientConfig};
use duochat::net::{self, NetCommand, NetEvent};
use duochat::ui;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // CLI args > env > config file > defaults.
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; ratatui owns stdout.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(server = %config.server_url, "duochat starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &config).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("duochat exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// log lines are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("duochat.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main application loop.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &ClientConfig,
) -> io::Result<()> {
    let prefs_path = Preferences::default_path();
    let prefs = prefs_path
        .as_deref()
        .map(Preferences::load)
        .transpose()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read preferences");
            None
        })
        .unwrap_or_default();

    let connection = match config.to_net_config() {
        Ok(net_config) => net::spawn_net(net_config).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    let (client, cmd_tx, mut evt_rx, offline_reason) = match connection {
        Ok(handle) => {
            let mut client = ChatClient::new(handle.outbound, config.typing_idle);
            client.set_local_id(handle.local_id);
            (client, Some(handle.commands), Some(handle.events), None)
        }
        Err(reason) => {
            tracing::warn!(%reason, "running offline");
            // Nothing drains this channel, so sends fail fast.
            let (tx, _) = mpsc::channel(1);
            (
                ChatClient::new(tx, config.typing_idle),
                None,
                None,
                Some(reason),
            )
        }
    };

    let mut app = App::new(client)
        .with_theme(prefs.theme)
        .with_prefs_path(prefs_path)
        .with_timestamp_format(&config.timestamp_format);
    match config.http_base() {
        Ok(base) => app = app.with_http_base(base),
        Err(e) => tracing::warn!(error = %e, "downloads disabled"),
    }
    if let Some(name) = &config.display_name {
        app.prefill_name(name);
    }
    if let Some(reason) = offline_reason {
        app.status = Some(format!("Could not connect, running offline ({reason})"));
    }

    loop {
        // Draw, then feed back what was visible.
        let mut report = Vec::new();
        terminal.draw(|frame| report = ui::draw(frame, &app))?;
        app.report_visibility(&report);

        if let Some(rx) = evt_rx.as_mut() {
            drain_net_events(&mut app, rx);
        }

        let now = Instant::now();
        app.tick(now);

        let timeout = app
            .client
            .next_deadline()
            .map_or(config.poll_timeout, |deadline| {
                deadline.saturating_duration_since(now).min(config.poll_timeout)
            });

        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            let commands = app.handle_key_event(key, Instant::now());
            for command in commands {
                dispatch(&mut app, cmd_tx.as_ref(), command);
            }
        }

        if app.should_quit {
            if let Some(tx) = &cmd_tx {
                let _ = tx.try_send(NetCommand::Shutdown);
            }
            return Ok(());
        }
    }
}

/// Hand a command to the network tasks, reporting a full or closed queue.
fn dispatch(app: &mut App, tx: Option<&mpsc::Sender<NetCommand>>, command: NetCommand) {
    let Some(tx) = tx else {
        if let NetCommand::Upload(job) = command {
            app.client.upload_failed(&job.temp_id, &job.file_name);
        }
        app.status = Some("Not connected, command not sent".to_string());
        return;
    };
    match tx.try_send(command) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(command) | mpsc::error::TrySendError::Closed(command)) => {
            if let NetCommand::Upload(job) = command {
                app.client.upload_failed(&job.temp_id, &job.file_name);
            }
            app.status = Some("Network busy or disconnected".to_string());
        }
    }
}

/// Apply all pending `NetEvent`s without blocking.
fn drain_net_events(app: &mut App, rx: &mut mpsc::Receiver<NetEvent>) {
    while let Ok(event) = rx.try_recv() {
        app.apply_net_event(event);
    }
}
