mod app;
mod components;
mod config;
mod editor;
mod error;
mod event;
mod fs;
mod handler;
mod logging;
mod navigator;
mod tui;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use crate::app::App;
use crate::config::{AppConfig, ConfigSource, GeneralConfig, LayeredConfig};
use crate::event::{Event, EventHandler};
use crate::fs::scanner::SearchTerm;
use crate::tui::{install_panic_hook, Tui};

const TICK_RATE: Duration = Duration::from_millis(50);

/// Browse a directory of Markdown and text notes and open them in your editor.
#[derive(Parser, Debug)]
#[command(name = "nnav", version, about)]
struct Cli {
    /// Only show notes containing this text (case-insensitive)
    search: Option<String>,

    /// Notes directory (overrides config)
    #[arg(long)]
    notes_dir: Option<String>,

    /// Editor to launch (overrides config)
    #[arg(long)]
    editor: Option<String>,

    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                notesdir: self.notes_dir.clone(),
                editor: self.editor.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _logging = logging::init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "exiting");
            eprintln!("nnav: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> error::Result<()> {
    match config::ensure_global_config() {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "global config in place"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "could not create default config"),
    }

    if let Some(path) = cli.config.as_deref() {
        if !path.is_file() {
            return Err(error::AppError::InvalidPath(format!(
                "{} does not exist",
                path.display()
            )));
        }
    }

    let config = LayeredConfig::new(cli.config.clone(), cli.overrides());
    let root = config.current().notes_root()?;
    let search = cli.search.as_deref().and_then(SearchTerm::new);

    // Load before touching the terminal so errors print cleanly.
    let mut app = App::new(&root, search, Box::new(config))?;

    install_panic_hook();
    let mut tui = Tui::new()?;
    let result = event_loop(&mut app, &mut tui).await;
    tui.restore()?;
    result
}

async fn event_loop(app: &mut App, tui: &mut Tui) -> error::Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    let event_tx = events.sender();

    let (width, height) = tui.size()?;
    app.navigator.resize(width, height);

    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(app, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(app, key),
            Event::Tick => app.clear_expired_status(),
            Event::Resize(w, h) => app.navigator.resize(w, h),
            Event::EditorExited(failure) => app.handle_editor_exit(failure),
        }

        if app.should_quit {
            break;
        }

        if let Some(request) = app.take_open_request() {
            events.pause().await;
            tui.suspend()?;
            let outcome = editor::launch(&request).await;
            tui.resume()?;
            events.resume();

            let failure = outcome.err().map(|e| match e {
                error::AppError::Editor(msg) => msg,
                other => other.to_string(),
            });
            if event_tx.send(Event::EditorExited(failure)).is_err() {
                tracing::warn!("event channel closed after editor exit");
            }
        }
    }

    Ok(())
}
