//! Progress bar rendering

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge},
    Frame,
};

use crate::model::PlaybackState;
use super::utils::format_duration;

pub fn render_progress_bar(frame: &mut Frame, area: Rect, playback: &PlaybackState) {
    let status_text = match &playback.current_track {
        None => " No track playing".to_string(),
        Some(track) => {
            let icon = if playback.is_playing { " ▶" } else { "⏸ " };
            format!(" {} {} | {} ({})", icon, track.name, track.artist_names(), track.album.name)
        }
    };

    let backend_text = if playback.is_authoritative_remote { "Remote" } else { "Preview" };
    let volume_text = format!("Vol: {}%", (playback.volume * 100.0).round() as u32);

    let time_str = format!(
        "{} / {}",
        format_duration(playback.progress_ms),
        format_duration(playback.duration_ms)
    );

    let controls_info = format!(" {} | {} ", backend_text, volume_text);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{} ", status_text))
                .title_bottom(Line::from(controls_info).right_aligned()),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(playback.progress_ratio())
        .label(time_str);

    frame.render_widget(gauge, area);
}
