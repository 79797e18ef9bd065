mod auth;
mod config;
mod controller;
mod coordinator;
mod error;
mod local;
mod logging;
mod model;
mod remote;
mod view;

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use auth::SpotifyTokens;
use config::Settings;
use controller::AppController;
use coordinator::Coordinator;
use local::{LocalPlayer, RodioElement};
use model::{SpotifyClient, UiState};
use remote::{LibrespotRuntime, RemoteSession};
use view::AppView;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();
    let _log_guard = match logging::init_logging(&settings) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("=== Tandem Player Starting ===");

    tracing::debug!(?settings, "Loaded settings");
    for value in &settings.ignored {
        tracing::warn!(%value, "Ignoring invalid setting");
    }

    let auth_result = auth::perform_oauth_flow().await?;
    let tokens = Arc::new(SpotifyTokens::new(&auth_result));
    let spotify_client = SpotifyClient::new(tokens.clone());

    let (remote, remote_events) = RemoteSession::new(
        Arc::new(LibrespotRuntime::new(
            Some(auth_result.cache.clone()),
            Arc::new(spotify_client.clone()),
        )),
        Arc::new(spotify_client.clone()),
        tokens,
        settings.device_name.clone(),
        settings.initial_volume,
    );

    let (audio_tx, audio_events) = mpsc::unbounded_channel();
    let element = RodioElement::new(audio_tx, settings.initial_volume)
        .context("Preview player unavailable")?;
    let local = LocalPlayer::new(Box::new(element), settings.initial_volume);

    let coordinator = Coordinator::new(remote, local, &settings);
    let (handle, player_task) = coordinator::spawn(coordinator, remote_events, audio_events, settings.progress_tick);

    let library = match spotify_client.saved_tracks(settings.queue_limit).await {
        Ok(tracks) => tracks,
        Err(e) => {
            tracing::warn!(error = %e, "Could not load saved tracks");
            Vec::new()
        }
    };
    tracing::info!(count = library.len(), "Loaded saved tracks");

    let mut controller = AppController::new(handle.clone(), UiState::new(library));

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut controller, &settings.device_name);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    if handle.shutdown().is_ok() {
        if let Err(e) = player_task.await {
            tracing::error!(error = %e, "Player task failed");
        }
    }

    tracing::info!("Tandem Player shutting down");
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut AppController,
    device_name: &str,
) -> io::Result<()> {
    loop {
        controller.ui.auto_clear_old_errors(Instant::now());

        let playback = controller.handle.state();
        terminal.draw(|f| {
            AppView::render(f, &playback, controller.ui_state(), device_name);
        })?;

        // Short poll keeps the progress bar smooth
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                controller.handle_key_event(key);
            }
        }

        if controller.should_quit() {
            break;
        }
    }

    Ok(())
}
