//! Playback actions

use super::AppController;

const SEEK_STEP_MS: i64 = 5_000;
const VOLUME_STEP: f32 = 0.05;

impl AppController {
    /// Play the selected saved track with the whole list as the queue
    pub fn play_selected(&mut self) {
        let Some(track) = self.ui.selected_track().cloned() else {
            return;
        };
        tracing::debug!(track_id = %track.id, "Playing selected track");
        let result = self.handle.play_track(track, Some(self.ui.library.clone()));
        self.report(result);
    }

    pub fn toggle_playback(&mut self) {
        let result = self.handle.toggle_play();
        self.report(result);
    }

    pub fn next_track(&mut self) {
        let result = self.handle.next();
        self.report(result);
    }

    pub fn previous_track(&mut self) {
        let result = self.handle.previous();
        self.report(result);
    }

    pub fn seek_relative(&mut self, forward: bool) {
        let state = self.handle.state();
        if state.current_track.is_none() {
            return;
        }
        let delta = if forward { SEEK_STEP_MS } else { -SEEK_STEP_MS };
        let target = (state.progress_ms as i64 + delta).clamp(0, state.duration_ms as i64);
        let result = self.handle.seek(target as u32);
        self.report(result);
    }

    pub fn volume_up(&mut self) {
        self.change_volume(VOLUME_STEP);
    }

    pub fn volume_down(&mut self) {
        self.change_volume(-VOLUME_STEP);
    }

    fn change_volume(&mut self, delta: f32) {
        let current = self.handle.state().volume;
        // Round to whole percent so repeated steps do not drift
        let new_volume = (((current + delta) * 100.0).round() / 100.0).clamp(0.0, 1.0);
        let result = self.handle.set_volume(new_volume);
        self.report(result);
    }
}
