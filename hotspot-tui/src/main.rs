/*!
 * Hotspot Connection Setter TUI
 * Terminal front end for the hotspot setter
 */

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::io;
use std::path::PathBuf;
use tokio::time::{interval, Duration};
use tracing_appender::non_blocking::WorkerGuard;

mod app;
mod ui;

use app::{App, Flow};
use hotspot_setter::AppConfig;
use ui::render_ui;

#[derive(Parser)]
#[command(name = "hotspot")]
#[command(about = "Hotspot Connection Setter TUI")]
struct Cli {
    /// Images to crop
    images: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the log file
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The terminal is ours, so logs go to a file
    let _guard = init_logging(&cli)?;

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path)?;
    tracing::info!("Hotspot TUI starting with config {}", config_path.display());

    let mut app = App::new(config, &cli.images).await;

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    // Create ticker for UI updates
    let mut ticker = interval(Duration::from_millis(100));

    loop {
        // Handle events
        if event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if app.on_key(key).await == Flow::Quit {
                    return Ok(());
                }
            }
        }

        ticker.tick().await;

        // Render UI
        terminal.draw(|f| render_ui(f, app))?;
    }
}

fn init_logging(cli: &Cli) -> Result<WorkerGuard> {
    let log_dir = cli.log_dir.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("hotspot-setter")
    });
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "hotspot-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("hotspot_setter={0},hotspot_tui={0}", log_level))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
