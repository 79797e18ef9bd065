//! Saved tracks list

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use ratatui::widgets::Padding;

use crate::model::Track;
use super::utils::{calculate_num_width, format_duration, truncate_string};

pub fn render_track_list(
    frame: &mut Frame,
    area: Rect,
    tracks: &[Track],
    selected_index: usize,
    current_id: Option<&str>,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Saved Tracks ")
        .padding(Padding::horizontal(1))
        .border_style(Style::default().fg(Color::Green));

    if tracks.is_empty() {
        let empty = Paragraph::new("No saved tracks")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let content_width = area.width.saturating_sub(4) as usize;
    let items = render_track_items(tracks, selected_index, current_id, content_width);

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default());

    let mut list_state = ListState::default();
    list_state.select(Some(selected_index + 1)); // +1 for header

    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_track_items(
    tracks: &[Track],
    selected_index: usize,
    current_id: Option<&str>,
    content_width: usize,
) -> Vec<ListItem<'static>> {
    let num_width = calculate_num_width(tracks.len());
    let preview_width = 2;
    let duration_width = 8;
    let fixed_width = 1 + num_width + 3 + preview_width + 3 + 3 + 3 + duration_width;
    let remaining_width = content_width.saturating_sub(fixed_width);
    let title_width = (remaining_width * 55) / 100;
    let artist_width = remaining_width.saturating_sub(title_width);

    let mut items: Vec<ListItem<'static>> = vec![
        ListItem::new(format!(
            " {:<num_width$}   {}   {:<title_width$}   {:<artist_width$}   {}",
            "#", "  ", "Title", "Artist", "Duration",
            num_width = num_width,
            title_width = title_width,
            artist_width = artist_width
        ))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    ];

    items.extend(tracks.iter().enumerate().map(|(i, track)| {
        let is_current = current_id == Some(track.id.as_str());
        let style = if i == selected_index {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else if is_current {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if !track.has_preview() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        let playing_indicator = if is_current { "▶" } else { " " };
        let track_num = format!("{}{:<num_width$}", playing_indicator, i + 1, num_width = num_width);
        // Marks tracks that stay silent while previews are the only backend
        let preview_indicator = if track.has_preview() { "  " } else { "∅ " };

        ListItem::new(format!(
            "{}   {}   {}   {}   {}",
            track_num,
            preview_indicator,
            truncate_string(&track.name, title_width),
            truncate_string(&track.artist_names(), artist_width),
            format_duration(track.duration_ms),
        ))
        .style(style)
    }));

    items
}
