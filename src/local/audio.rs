//! Host audio primitive used by the local fallback player

use anyhow::Result;

/// Feed reported by an [`AudioElement`]. Times are in seconds.
#[derive(Clone, Debug, PartialEq)]
pub enum AudioEvent {
    /// Clip metadata is known; `None` when the clip length cannot be determined.
    LoadedMetadata { duration_secs: Option<f64> },
    TimeUpdate { position_secs: f64 },
    Ended,
    Error { message: String },
}

/// A single-clip audio renderer, modelled on a browser audio element.
///
/// Changing or clearing the source abandons the previous clip; no events for
/// it are delivered afterwards. Playing a clip that has ended restarts it.
pub trait AudioElement: Send {
    fn set_source(&mut self, url: &str);

    /// Start or resume playback of the current source.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn seek(&mut self, position_secs: f64);

    fn set_volume(&mut self, volume: f32);

    /// Drop the current clip; nothing plays until a new source is set.
    fn clear_source(&mut self);

    /// Stop playback and free the output device. The element is unusable afterwards.
    fn release(&mut self);
}
