//! Controller module - Key handling for the terminal UI
//!
//! Translates key presses into [`PlayerHandle`] actions and keeps the
//! selection state the view draws.
//!
//! - `input`: Key event handling
//! - `playback`: Playback actions built on the current snapshot

mod input;
mod playback;

use crate::coordinator::PlayerHandle;
use crate::error::PlayerError;
use crate::model::UiState;

pub struct AppController {
    pub(crate) handle: PlayerHandle,
    pub(crate) ui: UiState,
}

impl AppController {
    pub fn new(handle: PlayerHandle, ui: UiState) -> Self {
        Self { handle, ui }
    }

    pub fn ui_state(&self) -> &UiState {
        &self.ui
    }

    pub fn should_quit(&self) -> bool {
        self.ui.should_quit
    }

    pub(crate) fn report(&mut self, result: Result<(), PlayerError>) {
        if let Err(e) = result {
            tracing::warn!(error = %e, "Player action rejected");
            self.ui.set_error(Self::format_error(&e));
        }
    }

    pub(crate) fn format_error(error: &PlayerError) -> String {
        match error {
            PlayerError::NotRunning => "Player stopped. Please restart the app.".to_string(),
            other => format!("Error: {}", other),
        }
    }
}
