//! askdb CLI
//!
//! Modes:
//! - TUI (default): interactive terminal session
//! - ask: one-shot question, transcript on stdout
//!
//! EXIT: /quit, /q, /exit and Ctrl+C work at any time

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{poll, read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use askdb::cli::{self, Args, Mode, EXIT_CONFIG_ERROR};
use askdb::controller::{Controller, Timings};
use askdb::ui::{handlers, App, AppState, Command};
use askdb_api::HttpService;
use askdb_core::ClientConfig;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match ClientConfig::load(args.config.as_deref(), &args.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let guard = match askdb::logging::init(&config.log_path(), &config.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let exit_code = match run(args, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("Error: {:#}", e);
            cli::EXIT_FAILURE
        }
    };
    info!(exit_code, "exiting");

    // Flush logs before exiting
    drop(guard);
    std::process::exit(exit_code);
}

async fn run(args: Args, config: &ClientConfig) -> Result<i32> {
    let service = HttpService::new(&config.base_url, config.request_timeout())
        .context("failed to build HTTP client")?;
    info!(base_url = %config.base_url, "service configured");
    let mut controller = Controller::new(Arc::new(service), Timings::from(config));

    match args.mode() {
        Mode::Ask(ask) => Ok(cli::run_ask(&mut controller, args.api_key.as_deref(), &ask).await?),
        Mode::Tui => {
            if let Some(ref key) = args.api_key {
                controller.set_api_key(key);
                // Nothing else is outstanding yet
                if let Err(e) = controller.authorize() {
                    info!(error = %e, "start-up authorization skipped");
                }
            }
            run_tui(controller).await?;
            Ok(cli::EXIT_SUCCESS)
        }
    }
}

/// Run TUI mode
async fn run_tui(controller: Controller) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(controller);
    let result = event_loop(&mut terminal, &mut app).await;

    // Cleanup runs even when the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    while app.state() != AppState::Quitting {
        askdb::ui::render(terminal, app)?;

        // Short poll, then yield so spawned calls make progress
        if poll(Duration::from_millis(50))? {
            if let Event::Key(key) = read()? {
                if key.kind == KeyEventKind::Press {
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        break;
                    }
                    handle_key_event(app, key);
                }
            }
        }
        tokio::task::yield_now().await;

        app.process_completions();
    }
    Ok(())
}

/// Handle keyboard input
fn handle_key_event(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            handlers::execute_command(app, Command::Run);
        }
        KeyCode::Char(c) => app.handle_char(c),
        KeyCode::Backspace => app.handle_backspace(),
        KeyCode::Enter => handlers::submit_input(app),
        KeyCode::Esc => {
            if app.help_visible() {
                app.hide_help();
            } else {
                app.input_buffer.clear();
                app.clear_status();
            }
        }
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(10),
        KeyCode::PageDown => app.scroll_down(10),
        KeyCode::Home => app.scroll_up(usize::MAX / 2),
        KeyCode::End => app.scroll_to_end(),
        _ => {}
    }
}
