//! Errors surfaced to consumers of the player handle

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// The coordinator task is gone (never started or already shut down).
    #[error("playback coordinator is not running; actions must be issued while the player is active")]
    NotRunning,

    #[error("volume {0} is outside 0.0..=1.0")]
    InvalidVolume(f32),
}
