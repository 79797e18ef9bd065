//! Merged playback state and the timing helper used for progress simulation

use std::time::Instant;

use super::track::Track;

/// Which backend currently serves playback actions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    Remote,
    Local,
}

impl Authority {
    /// Remote wins only once the device reported readiness and we know its id.
    pub fn resolve(is_ready: bool, device_id: Option<&str>) -> Self {
        if is_ready && device_id.is_some() {
            Authority::Remote
        } else {
            Authority::Local
        }
    }
}

/// Snapshot of what the user sees. Rebuilt as a whole on every update.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub progress_ms: u32,
    pub duration_ms: u32,
    pub volume: f32,
    pub is_ready: bool,
    pub is_authoritative_remote: bool,
    pub queue: Vec<Track>,
    pub current_index: i32,
}

impl PlaybackState {
    pub fn progress_ratio(&self) -> f64 {
        if self.duration_ms > 0 {
            (self.progress_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Position bookkeeping for a backend whose feed only reports discrete changes.
#[derive(Clone, Debug)]
pub struct PlaybackTiming {
    pub position_ms: u32,
    pub duration_ms: u32,
    pub is_playing: bool,
    pub last_update: Instant,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            position_ms: 0,
            duration_ms: 0,
            is_playing: false,
            last_update: Instant::now(),
        }
    }
}

impl PlaybackTiming {
    /// Accept a reported position, clamped to the known duration.
    pub fn update_position(&mut self, position_ms: u32, is_playing: bool, now: Instant) {
        self.position_ms = position_ms.min(self.duration_ms);
        self.is_playing = is_playing;
        self.last_update = now;
    }

    pub fn set_duration(&mut self, duration_ms: u32) {
        self.duration_ms = duration_ms;
        self.position_ms = self.position_ms.min(duration_ms);
    }

    /// Advance by the wall time elapsed since the last update while playing.
    pub fn advance(&mut self, now: Instant) {
        if self.is_playing {
            let elapsed = now.saturating_duration_since(self.last_update).as_millis();
            let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
            self.position_ms = self.position_ms.saturating_add(elapsed).min(self.duration_ms);
        }
        self.last_update = now;
    }
}

/// Clamp a position into `0..=duration`.
pub fn clamp_progress(progress_ms: u32, duration_ms: u32) -> u32 {
    progress_ms.min(duration_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn authority_is_pure_function_of_readiness_and_device() {
        assert_eq!(Authority::resolve(true, Some("dev1")), Authority::Remote);
        assert_eq!(Authority::resolve(false, Some("dev1")), Authority::Local);
        assert_eq!(Authority::resolve(true, None), Authority::Local);
        assert_eq!(Authority::resolve(false, None), Authority::Local);
    }

    #[test]
    fn advance_is_clamped_to_duration() {
        let start = Instant::now();
        let mut timing = PlaybackTiming::default();
        timing.set_duration(2_500);
        timing.update_position(1_000, true, start);

        timing.advance(start + Duration::from_millis(1_000));
        assert_eq!(timing.position_ms, 2_000);

        timing.advance(start + Duration::from_millis(5_000));
        assert_eq!(timing.position_ms, 2_500);
    }

    #[test]
    fn paused_timing_does_not_move() {
        let start = Instant::now();
        let mut timing = PlaybackTiming::default();
        timing.set_duration(10_000);
        timing.update_position(3_000, false, start);
        timing.advance(start + Duration::from_secs(4));
        assert_eq!(timing.position_ms, 3_000);
    }

    #[test]
    fn reported_position_beyond_duration_is_clamped() {
        let mut timing = PlaybackTiming::default();
        timing.set_duration(1_000);
        timing.update_position(9_999, true, Instant::now());
        assert_eq!(timing.position_ms, 1_000);
        assert_eq!(clamp_progress(5, 0), 0);
    }

    #[test]
    fn progress_ratio_handles_unknown_duration() {
        let mut state = PlaybackState {
            current_track: None,
            is_playing: false,
            progress_ms: 15_000,
            duration_ms: 0,
            volume: 0.5,
            is_ready: false,
            is_authoritative_remote: false,
            queue: Vec::new(),
            current_index: -1,
        };
        assert_eq!(state.progress_ratio(), 0.0);

        state.duration_ms = 30_000;
        assert_eq!(state.progress_ratio(), 0.5);
    }
}
