//! gaitview: terminal client for a gait repository server.
//!
//! Wires the terminal lifecycle (`tui`), the event bus (`event`), the HTTP
//! worker thread (`backend`), the live dashboard socket (`live`) and the
//! on-disk UI state (`gaitview-core::db`) around one [`app::AppState`].
//!
//! # Startup order
//!
//! 1. Parse flags and load config. `--print-config` exits here, before the
//!    terminal is touched.
//! 2. Start file logging under the state directory; stderr belongs to the TUI.
//! 3. Open the state database and hydrate the engine before the first frame.
//! 4. Spawn the backend worker. Every fallible step is done by here.
//! 5. `install_panic_hook()`, then `register_sigterm()`, then `init_tui()`.
//! 6. Start the input and live socket tasks, queue the first loads.
//!
//! Nothing after `init_tui()` returns early and the event loop only exits
//! through `break`, so `restore_tui()` always runs.

mod app;
mod backend;
mod config;
mod event;
mod live;
mod theme;
mod tui;
mod ui;

use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use gaitview_core::db;
use gaitview_core::engine::Engine;
use gaitview_core::feed::StatusLevel;
use tracing_subscriber::EnvFilter;

use crate::config::{Cli, Config};
use crate::event::AppEvent;
use crate::ui::keybindings::{handle_key, handle_mouse, KeyAction};

/// Log level filter variable, e.g. `GAITVIEW_LOG=gaitview_core=debug`.
const LOG_ENV: &str = "GAITVIEW_LOG";
const LOG_FILE: &str = "gaitview.log";

fn init_logging(state_dir: &std::path::Path) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(state_dir.join(LOG_FILE))
        .with_context(|| format!("opening log file in {}", state_dir.display()))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(config::config_path);
    let (mut config, config_warning) = Config::load(&path);
    config.apply_cli(&cli);

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    std::fs::create_dir_all(&config.state_dir)
        .with_context(|| format!("creating {}", config.state_dir.display()))?;
    init_logging(&config.state_dir)?;
    if let Some(warning) = config_warning {
        tracing::warn!("{warning}");
    }
    tracing::info!(server = %config.server, "starting gaitview");

    let theme = theme::Theme::from_name(&config.theme);

    // Opened before the first frame so there is no "restoring" state to draw.
    let conn = db::open_state_db(&config.state_dir).await?;
    let persisted = db::load_ui_state(&conn).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read saved ui state");
        Default::default()
    });
    let prefs = db::load_layout_prefs(&conn).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read saved layout");
        Default::default()
    });

    let engine_config = config.engine();
    let mut engine = Engine::new(&engine_config);
    engine.hydrate(persisted);
    let mut state = app::AppState::new(engine, prefs);

    let handler = event::EventHandler::new();
    let backend_tx = backend::spawn_backend_worker(&config.server, handler.tx.clone())?;

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm();
    let mut terminal = match tui::init_tui() {
        Ok(terminal) => terminal,
        Err(e) => {
            // Raw mode may already be on.
            let _ = tui::restore_tui();
            return Err(e).context("initialising terminal");
        }
    };

    event::spawn_event_task(handler.tx.clone());
    live::spawn_live_task(config.live_url(), engine_config.reconnect, handler.tx.clone());
    let mut rx = handler.rx;

    state.start();
    backend::dispatch(&backend_tx, state.take_outbox());

    'event_loop: loop {
        tokio::select! {
            // Heartbeat so SIGTERM is noticed even when no events arrive.
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
                continue 'event_loop;
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(AppEvent::Render) => {
                        // The only draw() call in the program.
                        if let Err(e) = terminal.draw(|frame| ui::render(frame, &mut state, &theme)) {
                            tracing::error!(error = %e, "draw failed");
                            break 'event_loop;
                        }
                    }
                    Some(AppEvent::Key(key)) => {
                        if handle_key(key, &mut state) == KeyAction::Quit {
                            break 'event_loop;
                        }
                    }
                    Some(AppEvent::Mouse(mouse)) => {
                        handle_mouse(mouse, &mut state);
                    }
                    // ratatui picks up the new size on the next draw.
                    Some(AppEvent::Resize(_, _)) => {}
                    Some(AppEvent::Tick) => state.on_tick(Instant::now()),
                    Some(AppEvent::Backend(reply)) => state.on_backend_reply(*reply),
                    Some(AppEvent::Live(live)) => state.on_live(live),
                    Some(AppEvent::Quit) | None => break 'event_loop,
                }
            }
        }

        if !backend::dispatch(&backend_tx, state.take_outbox()) {
            state.engine.feed.set_status(StatusLevel::Error, "Backend worker stopped");
        }
        let pending = state.engine.take_pending_writes();
        if !pending.is_empty() {
            if let Err(e) = db::save_pending(&conn, pending).await {
                tracing::warn!(error = %e, "could not save ui state");
            }
        }
        if state.prefs_dirty {
            state.prefs_dirty = false;
            if let Err(e) = db::save_layout_prefs(&conn, &state.prefs).await {
                tracing::warn!(error = %e, "could not save layout");
            }
        }
        if term_flag.load(Ordering::Relaxed) {
            break 'event_loop;
        }
    }

    tui::restore_tui()?;
    tracing::info!("gaitview exited");
    Ok(())
}
