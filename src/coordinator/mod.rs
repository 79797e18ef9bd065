//! Playback coordinator
//!
//! Decides which backend serves each action and merges both backends into
//! one [`PlaybackState`]. The remote device is authoritative whenever it is
//! ready and its id is known; otherwise the local preview player is.
//!
//! Playback is never carried over when authority changes. If the remote
//! device becomes ready while a preview clip plays (or drops while remote
//! playback runs) nothing is transferred; the next user action starts
//! playback on whichever backend is then authoritative, using the last
//! requested track.

mod handle;

use std::time::Instant;

use crate::config::Settings;
use crate::local::{AudioEvent, LocalPlayOutcome, LocalPlayer};
use crate::model::{clamp_progress, Authority, PlaybackState, Queue, Track};
use crate::remote::{RemoteEvent, RemoteSession};

pub use handle::{spawn, Command, PlayerHandle};

pub struct Coordinator {
    remote: RemoteSession,
    local: LocalPlayer,
    queue: Queue,
    /// Most recent track the user asked for, whichever backend served it
    last_requested: Option<Track>,
    preview_fallback_duration_ms: u32,
}

impl Coordinator {
    pub fn new(remote: RemoteSession, local: LocalPlayer, settings: &Settings) -> Self {
        Self {
            remote,
            local,
            queue: Queue::default(),
            last_requested: None,
            preview_fallback_duration_ms: settings.preview_fallback_duration_ms,
        }
    }

    pub fn initialize(&mut self) {
        self.remote.initialize();
    }

    /// Evaluated fresh on every call; never cached.
    pub fn authority(&self) -> Authority {
        Authority::resolve(self.remote.is_ready(), self.remote.device_id())
    }

    pub async fn execute(&mut self, command: Command) {
        match command {
            Command::PlayTrack { track, queue } => self.play_track(track, queue).await,
            Command::TogglePlay => self.toggle_play().await,
            Command::Next => self.next().await,
            Command::Previous => self.previous().await,
            Command::Seek(position_ms) => self.seek(position_ms).await,
            Command::SetVolume(volume) => self.set_volume(volume).await,
            Command::Shutdown => self.shutdown().await,
        }
    }

    pub async fn play_track(&mut self, track: Track, queue: Option<Vec<Track>>) {
        if let Some(tracks) = queue {
            self.queue.replace(tracks, &track);
        }
        self.last_requested = Some(track.clone());

        let authority = self.authority();
        tracing::debug!(track_id = %track.id, ?authority, index = self.queue.current_index(), "Play track");
        match authority {
            Authority::Remote => {
                self.local.pause();
                self.remote.play(&track.uri(), None).await;
            }
            Authority::Local => {
                if self.local.play_track(&track) == LocalPlayOutcome::NoPreview {
                    tracing::info!(track = %track.name, "Track has no preview; skipping audio in fallback mode");
                }
            }
        }
    }

    pub async fn toggle_play(&mut self) {
        match self.authority() {
            Authority::Remote => {
                if self.remote.track().is_none() {
                    if let Some(track) = self.last_requested.clone() {
                        self.remote.play(&track.uri(), None).await;
                        return;
                    }
                }
                self.remote.toggle_play().await;
            }
            Authority::Local => {
                let loaded = self.local.current_track().is_some();
                match self.last_requested.clone() {
                    Some(track) if !loaded => {
                        self.local.play_track(&track);
                    }
                    _ => self.local.toggle_play(),
                }
            }
        }
    }

    pub async fn next(&mut self) {
        self.step(1).await;
    }

    pub async fn previous(&mut self) {
        self.step(-1).await;
    }

    async fn step(&mut self, step: i32) {
        match self.authority() {
            Authority::Remote if step > 0 => self.remote.next().await,
            Authority::Remote => self.remote.previous().await,
            Authority::Local => {
                let Some(track) = self.queue.advance(step).cloned() else {
                    tracing::debug!("Queue is empty, nothing to step to");
                    return;
                };
                self.play_track(track, None).await;
            }
        }
    }

    pub async fn seek(&mut self, position_ms: u32) {
        match self.authority() {
            Authority::Remote => self.remote.seek(position_ms).await,
            Authority::Local => self.local.seek(position_ms as f64 / 1000.0),
        }
    }

    pub async fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        match self.authority() {
            Authority::Remote => self.remote.set_volume(volume).await,
            Authority::Local => self.local.set_volume(volume),
        }
    }

    pub fn on_remote_event(&mut self, event: RemoteEvent) {
        let before = self.authority();
        self.remote.apply(event);
        let after = self.authority();
        if before != after {
            tracing::info!(from = ?before, to = ?after, "Playback authority changed");
            if after == Authority::Remote {
                self.local.pause();
            }
        }
    }

    pub async fn on_audio_event(&mut self, event: AudioEvent) {
        let ended = self.local.handle_event(event);
        if ended && self.authority() == Authority::Local {
            self.auto_advance();
        }
    }

    /// Move to the next queued clip after the current one finished.
    fn auto_advance(&mut self) {
        let Some(track) = self.queue.advance(1).cloned() else {
            return;
        };
        tracing::debug!(track_id = %track.id, index = self.queue.current_index(), "Auto-advancing preview");
        self.local.play_track(&track);
        self.last_requested = Some(track);
    }

    pub fn tick(&mut self, now: Instant) {
        self.remote.tick(now);
    }

    pub async fn shutdown(&mut self) {
        self.remote.teardown().await;
        self.local.teardown();
    }

    /// Merged view from whichever backend is authoritative, times in milliseconds.
    pub fn state(&self) -> PlaybackState {
        let authority = self.authority();
        let (current_track, is_playing, progress_ms, duration_ms, volume) = match authority {
            Authority::Remote => {
                let duration_ms = self.remote.duration_ms();
                (
                    self.remote.track().cloned().or_else(|| self.last_requested.clone()),
                    self.remote.is_playing(),
                    clamp_progress(self.remote.progress_ms(), duration_ms),
                    duration_ms,
                    self.remote.volume(),
                )
            }
            Authority::Local => {
                let duration_ms = self
                    .local
                    .duration_secs()
                    .map(secs_to_ms)
                    .unwrap_or(self.preview_fallback_duration_ms);
                (
                    self.local.current_track().cloned().or_else(|| self.last_requested.clone()),
                    self.local.is_playing(),
                    clamp_progress(secs_to_ms(self.local.position_secs()), duration_ms),
                    duration_ms,
                    self.local.volume(),
                )
            }
        };

        PlaybackState {
            current_track,
            is_playing,
            progress_ms,
            duration_ms,
            volume,
            is_ready: self.remote.is_ready(),
            is_authoritative_remote: authority == Authority::Remote,
            queue: self.queue.tracks().to_vec(),
            current_index: self.queue.current_index(),
        }
    }
}

fn secs_to_ms(secs: f64) -> u32 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}
