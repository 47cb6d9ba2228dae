//! Snail Hive Mind: a shared, persistent story written by many players and
//! one AI narrator.
//!
//! Every player reads the same story. Each contribution passes a moderation
//! gate, is appended permanently, and the narrator answers it.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a line-oriented interface suitable for scripts:
//!
//! ```bash
//! cargo run -p hive -- --headless --store memory
//! ```

mod app;
mod events;
mod headless;
mod ui;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use hive_core::{HiveConfig, StoreConfig, StorySession};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::File;
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use app::App;
use events::{handle_event, EventResult};
use ui::render::render;

#[derive(Debug, Parser)]
#[command(name = "hive", version, about = "One shared story, many players, one hungry snail")]
struct Cli {
    /// Plain stdin/stdout mode instead of the TUI
    #[arg(long)]
    headless: bool,

    /// Story store: `memory`, `sqlite://<path>` or a PostgREST URL (overrides HIVE_STORE)
    #[arg(long)]
    store: Option<String>,

    /// Generation model (overrides HIVE_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Skip the moderation gate
    #[arg(long)]
    no_moderation: bool,

    /// How many recent turns the narrator sees (overrides HIVE_CONTEXT_TURNS)
    #[arg(long)]
    context_turns: Option<usize>,

    /// Log file used while the TUI owns the terminal
    #[arg(long, default_value = "hive.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Configuration is read from the environment and an optional .env file.");
            std::process::exit(1);
        }
    };

    init_logging(&cli)?;

    if !config.store.is_persistent() {
        tracing::warn!("story store is in memory; the story ends when this process exits");
    }

    let session = StorySession::from_config(&config)
        .await
        .with_context(|| format!("failed to open story store {}", config.store.describe()))?;

    if cli.headless {
        return headless::run_headless(session).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(session)).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result.context("terminal error")
}

/// Environment first, then command-line overrides.
fn build_config(cli: &Cli) -> anyhow::Result<HiveConfig> {
    let mut config = HiveConfig::from_env()?;

    if let Some(raw) = &cli.store {
        let key = std::env::var("SUPABASE_KEY").ok().filter(|k| !k.is_empty());
        let table = std::env::var("HIVE_TABLE")
            .ok()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| hive_core::config::DEFAULT_TABLE.to_string());
        config = config.with_store(StoreConfig::parse(raw, key, &table)?);
    }
    if let Some(model) = &cli.model {
        config = config.with_model(model);
    }
    if cli.no_moderation {
        config = config.with_moderation(false);
    }
    if let Some(turns) = cli.context_turns {
        config = config.with_context_turns(turns);
    }

    Ok(config)
}

/// Headless logs go to stderr; the TUI logs to a file so the screen stays clean.
fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if cli.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        let file = File::create(&cli.log_file)
            .with_context(|| format!("failed to create log file {}", cli.log_file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| render(f, &app))?;

        // Run any queued action; redraw first so the status is visible.
        if let Some(action) = app.pending_action.take() {
            app.begin(&action);
            terminal.draw(|f| render(f, &app))?;

            let update = app.session.handle(action).await;
            app.apply(update);
            continue;
        }

        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            if handle_event(&mut app, ev) == EventResult::Quit {
                return Ok(());
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
