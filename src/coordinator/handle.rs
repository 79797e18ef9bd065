//! Consumer-facing handle and the control task that owns the coordinator

use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::PlayerError;
use crate::local::AudioEvent;
use crate::model::{PlaybackState, Track};
use crate::remote::RemoteEvent;
use super::Coordinator;

/// Actions accepted by the control task
#[derive(Clone, Debug)]
pub enum Command {
    PlayTrack { track: Track, queue: Option<Vec<Track>> },
    TogglePlay,
    Next,
    Previous,
    Seek(u32),
    SetVolume(f32),
    Shutdown,
}

/// Cheap, cloneable access to the player.
///
/// Every action fails with [`PlayerError::NotRunning`] once the control task is gone.
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<PlaybackState>,
}

impl PlayerHandle {
    /// Latest published snapshot
    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    pub fn play_track(&self, track: Track, queue: Option<Vec<Track>>) -> Result<(), PlayerError> {
        self.send(Command::PlayTrack { track, queue })
    }

    pub fn toggle_play(&self) -> Result<(), PlayerError> {
        self.send(Command::TogglePlay)
    }

    pub fn next(&self) -> Result<(), PlayerError> {
        self.send(Command::Next)
    }

    pub fn previous(&self) -> Result<(), PlayerError> {
        self.send(Command::Previous)
    }

    pub fn seek(&self, position_ms: u32) -> Result<(), PlayerError> {
        self.send(Command::Seek(position_ms))
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), PlayerError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlayerError::InvalidVolume(volume));
        }
        self.send(Command::SetVolume(volume))
    }

    pub fn shutdown(&self) -> Result<(), PlayerError> {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> Result<(), PlayerError> {
        self.commands.send(command).map_err(|_| PlayerError::NotRunning)
    }
}

/// Start the control task. All coordinator logic runs on it, one event at a time.
pub fn spawn(
    mut coordinator: Coordinator,
    mut remote_events: mpsc::UnboundedReceiver<RemoteEvent>,
    mut audio_events: mpsc::UnboundedReceiver<AudioEvent>,
    tick: Duration,
) -> (PlayerHandle, JoinHandle<()>) {
    let (commands_tx, mut commands) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(coordinator.state());

    let task = tokio::spawn(async move {
        coordinator.initialize();

        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => coordinator.execute(command).await,
                },
                Some(event) = remote_events.recv() => coordinator.on_remote_event(event),
                Some(event) = audio_events.recv() => coordinator.on_audio_event(event).await,
                _ = ticker.tick() => coordinator.tick(Instant::now()),
            }

            let next = coordinator.state();
            state_tx.send_if_modified(|current| {
                if *current == next {
                    false
                } else {
                    *current = next;
                    true
                }
            });
        }

        tracing::info!("Playback coordinator stopping");
        // Refuse further actions before the slower teardown runs
        commands.close();
        coordinator.shutdown().await;
        state_tx.send_replace(coordinator.state());
    });

    (
        PlayerHandle {
            commands: commands_tx,
            state: state_rx,
        },
        task,
    )
}
