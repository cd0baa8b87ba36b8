use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::{error::Error, fs::OpenOptions, io, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

mod app;

const DEFAULT_DB_PATH: &str = "tasks.db";
const LOG_PATH: &str = "tasklist.log";

// The alternate screen owns the terminal, so logs go to a file.
// Level via RUST_LOG, default info.
fn init_logging() -> Result<(), Box<dyn Error>> {
    let log_file = OpenOptions::new().create(true).append(true).open(LOG_PATH)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;

    // Database path is the optional first argument
    let db_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
    let storage = app::storage::Storage::open(&db_path)
        .map_err(|err| format!("failed to open {db_path}: {err}"))?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the event loop with a 250 ms tick
    let tick_rate = Duration::from_millis(250);
    let app = app::ui::App::new(&storage);
    let res = app::ui::run_app(&mut terminal, app, tick_rate);

    // Restore previous terminal state after exit
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}
