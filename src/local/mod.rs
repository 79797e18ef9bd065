//! Local fallback player
//!
//! Plays a track's short preview clip through one exclusively owned
//! [`AudioElement`]. Only tracks with a preview URL are audible here.

mod audio;
mod rodio_element;

use crate::model::Track;

pub use audio::{AudioElement, AudioEvent};
pub use rodio_element::RodioElement;

/// Result of asking the fallback player to play a track
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalPlayOutcome {
    Started,
    /// The track has no preview clip; nothing is audible.
    NoPreview,
    /// The element refused to start; see the log.
    Failed,
}

pub struct LocalPlayer {
    element: Box<dyn AudioElement>,
    current_track: Option<Track>,
    /// Preview URL loaded into the element, `None` when nothing is audible
    source: Option<String>,
    is_playing: bool,
    /// The loaded clip played through to its end
    ended: bool,
    position_secs: f64,
    duration_secs: Option<f64>,
    volume: f32,
    released: bool,
}

impl LocalPlayer {
    pub fn new(mut element: Box<dyn AudioElement>, volume: f32) -> Self {
        element.set_volume(volume);
        Self {
            element,
            current_track: None,
            source: None,
            is_playing: false,
            ended: false,
            position_secs: 0.0,
            duration_secs: None,
            volume,
            released: false,
        }
    }

    pub fn play_track(&mut self, track: &Track) -> LocalPlayOutcome {
        if self.released {
            return LocalPlayOutcome::Failed;
        }

        self.current_track = Some(track.clone());
        self.position_secs = 0.0;
        self.duration_secs = None;
        self.ended = false;

        let Some(url) = track.preview_url.as_deref().filter(|url| !url.is_empty()) else {
            tracing::warn!(track_id = %track.id, track = %track.name, "No preview clip, track is not playable locally");
            // Detach the previous clip so none of its feed reaches the new track
            self.element.clear_source();
            self.source = None;
            self.is_playing = false;
            return LocalPlayOutcome::NoPreview;
        };

        if self.start(url) {
            tracing::info!(track_id = %track.id, track = %track.name, "Playing preview clip");
            LocalPlayOutcome::Started
        } else {
            LocalPlayOutcome::Failed
        }
    }

    /// Load `url` from the beginning and play it.
    fn start(&mut self, url: &str) -> bool {
        self.element.set_source(url);
        self.source = Some(url.to_string());
        self.ended = false;
        self.position_secs = 0.0;
        match self.element.play() {
            Ok(()) => {
                self.is_playing = true;
                true
            }
            Err(e) => {
                tracing::error!(url, error = %e, "Failed to start preview clip");
                self.is_playing = false;
                false
            }
        }
    }

    pub fn toggle_play(&mut self) {
        if self.released {
            return;
        }
        let Some(url) = self.source.clone() else {
            tracing::debug!("Nothing loaded locally, ignoring toggle");
            return;
        };
        if self.is_playing {
            self.pause();
        } else if self.ended {
            tracing::debug!("Replaying finished preview clip");
            self.start(&url);
        } else {
            match self.element.play() {
                Ok(()) => self.is_playing = true,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to resume preview clip");
                    self.is_playing = false;
                }
            }
        }
    }

    /// Silence the clip, keeping it loaded so a later toggle resumes it.
    pub fn pause(&mut self) {
        if self.released || !self.is_playing {
            return;
        }
        self.element.pause();
        self.is_playing = false;
    }

    pub fn seek(&mut self, position_secs: f64) {
        if self.released || self.source.is_none() {
            return;
        }
        let upper = self.duration_secs.unwrap_or(f64::MAX);
        let position_secs = position_secs.clamp(0.0, upper);
        self.element.seek(position_secs);
        self.position_secs = position_secs;
    }

    pub fn set_volume(&mut self, volume: f32) {
        if self.released {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.element.set_volume(self.volume);
    }

    /// Fold an element event into local state.
    ///
    /// Returns `true` when the clip finished and the caller should advance.
    pub fn handle_event(&mut self, event: AudioEvent) -> bool {
        if self.released || self.source.is_none() {
            return false;
        }
        match event {
            AudioEvent::LoadedMetadata { duration_secs } => {
                self.duration_secs = duration_secs.filter(|d| d.is_finite() && *d > 0.0);
                false
            }
            AudioEvent::TimeUpdate { position_secs } => {
                self.position_secs = position_secs.max(0.0);
                false
            }
            AudioEvent::Ended => {
                tracing::debug!("Preview clip ended");
                self.is_playing = false;
                self.ended = true;
                true
            }
            AudioEvent::Error { message } => {
                tracing::error!(error = %message, "Preview clip playback failed");
                self.is_playing = false;
                false
            }
        }
    }

    /// Pause and release the audio element. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.element.pause();
        self.element.release();
        self.released = true;
        self.is_playing = false;
        self.source = None;
        tracing::debug!("Local player torn down");
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}
