//! Key event handling

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use super::AppController;

impl AppController {
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        // Error message blocks all other interactions
        if self.ui.error_message.is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.ui.clear_error();
            }
            return;
        }

        if self.ui.show_help_popup {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H')) {
                self.ui.show_help_popup = false;
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.ui.should_quit = true;
            }
            KeyCode::Up => self.ui.move_up(),
            KeyCode::Down => self.ui.move_down(),
            KeyCode::Enter => self.play_selected(),
            KeyCode::Char(' ') => self.toggle_playback(),
            KeyCode::Char('n') | KeyCode::Char('N') => self.next_track(),
            KeyCode::Char('p') | KeyCode::Char('P') => self.previous_track(),
            KeyCode::Left => self.seek_relative(false),
            KeyCode::Right => self.seek_relative(true),
            KeyCode::Char('+') | KeyCode::Char('=') => self.volume_up(),
            KeyCode::Char('-') => self.volume_down(),
            KeyCode::Char('h') | KeyCode::Char('H') => {
                self.ui.show_help_popup = true;
            }
            _ => {}
        }
    }
}
