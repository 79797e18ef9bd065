//! Terminal UI state kept next to the player snapshot

use std::time::{Duration, Instant};

use super::track::Track;

const ERROR_DISPLAY: Duration = Duration::from_secs(5);

/// Selection and overlay state owned by the controller
#[derive(Clone, Debug, Default)]
pub struct UiState {
    /// Saved tracks shown in the list; also the queue handed to the player
    pub library: Vec<Track>,
    pub selected: usize,
    pub error_message: Option<String>,
    pub error_timestamp: Option<Instant>,
    pub show_help_popup: bool,
    pub should_quit: bool,
}

impl UiState {
    pub fn new(library: Vec<Track>) -> Self {
        Self {
            library,
            ..Default::default()
        }
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.library.get(self.selected)
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected < self.library.len().saturating_sub(1) {
            self.selected += 1;
        }
    }

    pub fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
        self.error_timestamp = Some(Instant::now());
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
        self.error_timestamp = None;
    }

    pub fn auto_clear_old_errors(&mut self, now: Instant) {
        if let Some(timestamp) = self.error_timestamp {
            if now.duration_since(timestamp) > ERROR_DISPLAY {
                self.clear_error();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(ids: &[&str]) -> Vec<Track> {
        ids.iter()
            .map(|id| Track {
                id: id.to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut ui = UiState::new(library(&["a", "b"]));
        ui.move_up();
        assert_eq!(ui.selected, 0);
        ui.move_down();
        ui.move_down();
        assert_eq!(ui.selected, 1);
        assert_eq!(ui.selected_track().map(|t| t.id.as_str()), Some("b"));
    }

    #[test]
    fn empty_library_has_no_selection() {
        let mut ui = UiState::new(Vec::new());
        ui.move_down();
        assert_eq!(ui.selected, 0);
        assert!(ui.selected_track().is_none());
    }

    #[test]
    fn errors_expire() {
        let mut ui = UiState::default();
        ui.set_error("boom".into());
        let shown_at = ui.error_timestamp.unwrap();

        ui.auto_clear_old_errors(shown_at + Duration::from_secs(1));
        assert!(ui.error_message.is_some());

        ui.auto_clear_old_errors(shown_at + Duration::from_secs(6));
        assert!(ui.error_message.is_none());
    }
}
