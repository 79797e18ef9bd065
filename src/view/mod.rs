//! View module - UI rendering
//!
//! Draws the published [`PlaybackState`] and the controller's [`UiState`] with ratatui.
//!
//! - `utils`: Shared formatting helpers
//! - `layout`: Top bar with backend and device status
//! - `content`: Saved tracks list
//! - `progress`: Progress bar
//! - `overlays`: Error notification and help popup

mod utils;
mod layout;
mod content;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::{PlaybackState, UiState};

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, playback: &PlaybackState, ui_state: &UiState, device_name: &str) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Backend + device
                Constraint::Min(0),    // Saved tracks
                Constraint::Length(3), // Progress bar with playback info
            ])
            .split(frame.area());

        layout::render_top_bar(frame, chunks[0], playback, device_name);

        let current_id = playback.current_track.as_ref().map(|t| t.id.as_str());
        content::render_track_list(frame, chunks[1], &ui_state.library, ui_state.selected, current_id);

        progress::render_progress_bar(frame, chunks[2], playback);

        if ui_state.error_message.is_some() {
            overlays::render_error_notification(frame, ui_state);
        }

        if ui_state.show_help_popup {
            overlays::render_help_popup(frame);
        }
    }
}
