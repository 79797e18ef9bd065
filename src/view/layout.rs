//! Top bar rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use ratatui::widgets::Padding;

use crate::model::PlaybackState;

pub fn render_top_bar(frame: &mut Frame, area: Rect, playback: &PlaybackState, device_name: &str) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Backend status
            Constraint::Length(25), // Device name
        ])
        .split(area);

    let (status_text, status_color) = backend_status(playback);
    let status = Paragraph::new(status_text)
        .style(Style::default().fg(status_color))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Playback ")
                .padding(Padding::horizontal(1)),
        );
    frame.render_widget(status, chunks[0]);

    let device_style = if playback.is_ready {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let device = Paragraph::new(format!("🎵 {}", device_name))
        .style(device_style)
        .block(Block::default().borders(Borders::ALL).title(" Device "));
    frame.render_widget(device, chunks[1]);
}

fn backend_status(playback: &PlaybackState) -> (&'static str, Color) {
    if playback.is_authoritative_remote {
        ("Streaming full tracks on this device", Color::Green)
    } else if playback.is_ready {
        ("Device connected, waiting for playback focus", Color::Yellow)
    } else {
        ("Playing 30 second previews", Color::Yellow)
    }
}
