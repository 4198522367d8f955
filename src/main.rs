//! WebOS - Terminal entry point
//!
//! Runs a single terminal session against the PTY sandbox, using the
//! terminal this binary was started in as the emulator.

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute, terminal,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use webos::{
    core::{
        config::Config,
        events::{EventSender, SessionEvent},
    },
    sandbox::PtyRuntime,
    session::{HostWindow, SessionOptions, TerminalSession},
    terminal::{key_bytes, CellSize, GridSize, HostTerminal, Viewport},
};

#[derive(Parser)]
#[command(name = "webos", about = "Run a sandboxed WebOS terminal session")]
struct Cli {
    /// Print the configuration file path and exit
    #[arg(long)]
    print_config_path: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,

    /// Shell to spawn instead of the configured one
    #[arg(long)]
    shell: Option<String>,
}

/// Keeps the host terminal in raw mode; restores it when dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("stdin is not a terminal")?;
        let guard = Self;
        execute!(std::io::stdout(), EnableBracketedPaste)?;
        Ok(guard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(std::io::stdout(), DisableBracketedPaste);
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the terminal session. Only
    // warnings by default, since stderr shares the raw-mode screen
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if cli.print_config_path {
        println!("{}", Config::config_path()?.display());
        return Ok(());
    }
    if cli.print_default_config {
        print!("{}", Config::default_config_str());
        return Ok(());
    }

    let mut config = Config::load()?;
    if let Some(shell) = cli.shell {
        config.sandbox.shell = shell;
    }
    info!("Configuration loaded");

    let cell = config.terminal.cell_size();
    let viewport = match terminal::size() {
        Ok((cols, rows)) => Viewport::from_grid(GridSize::new(cols, rows), cell),
        Err(e) => {
            warn!("Cannot query terminal size, using configured viewport: {}", e);
            config.terminal.viewport()
        }
    };

    let _raw_mode = RawModeGuard::enable()?;

    let runtime = Arc::new(PtyRuntime::new(config.sandbox.clone()));
    let terminal = Arc::new(HostTerminal::new(cell));
    let window = Arc::new(HostWindow::new(viewport));
    let (events, mut event_rx) = EventSender::channel();

    let session = TerminalSession::new(
        1,
        runtime,
        terminal.clone(),
        Arc::clone(&window),
        SessionOptions::from_config(&config.sandbox),
        events,
    );
    session.mount();
    spawn_input_reader(terminal, window, cell);

    // Ctrl-C arrives as a key and goes to the shell; only the shell ending stops us
    loop {
        match event_rx.recv().await {
            Some(SessionEvent::Exited { .. }) | Some(SessionEvent::BootFailed { .. }) | None => break,
            Some(event) => debug!("Session event: {:?}", event),
        }
    }

    session.unmount();
    Ok(())
}

/// Read host terminal events until the terminal goes away.
///
/// A plain thread so a pending read never holds up runtime shutdown.
fn spawn_input_reader(terminal: Arc<HostTerminal>, window: Arc<HostWindow>, cell: CellSize) {
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(event) => handle_host_event(event, &terminal, &window, cell),
            Err(e) => {
                warn!("Failed to read terminal events: {}", e);
                break;
            }
        }
    });
}

/// Turn one host terminal event into a keystroke or a window resize
fn handle_host_event(event: Event, terminal: &HostTerminal, window: &HostWindow, cell: CellSize) {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => {
            if let Some(bytes) = key_bytes(&key) {
                terminal.feed_input(&bytes);
            }
        }
        Event::Paste(text) => terminal.feed_input(text.as_bytes()),
        Event::Resize(cols, rows) => {
            debug!("Host terminal resized to {}x{}", cols, rows);
            window.resize(Viewport::from_grid(GridSize::new(cols, rows), cell));
        }
        _ => {}
    }
}
