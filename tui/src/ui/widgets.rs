use crate::app::{App, NotificationKind, ViewMode};
use poimap_core::models::Category;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span, Text},
    widgets::{
        canvas::{Canvas, Map, MapResolution, Points},
        Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap,
    },
    Frame,
};

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

/// Render the header with the category tabs
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        " 🗺 poimap ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];

    for (i, category) in Category::ALL.iter().enumerate() {
        let label = format!(" {}:{} ", i + 1, category.display_name());
        let style = if app.view == ViewMode::Category && *category == app.category {
            Style::default()
                .bg(rgb(category.marker_rgb()))
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(rgb(category.marker_rgb()))
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(label, style));
    }

    let favorites_style = if app.view == ViewMode::Favorites {
        Style::default().bg(Color::Yellow).fg(Color::Black).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Yellow)
    };
    spans.push(Span::raw("  "));
    spans.push(Span::styled(" v:★ Favorites ", favorites_style));

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);

    frame.render_widget(header, area);
}

/// Render the map canvas: world outline, markers, selection
pub fn render_map(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = match app.view {
        ViewMode::Category => format!(" {} ", app.category.display_name()),
        ViewMode::Favorites => " Favorites ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    app.map_area = inner;

    let (x_bounds, y_bounds) = app.viewport.bounds(inner.width, inner.height);
    let points: Vec<((f64, f64), Color)> = app
        .markers
        .iter()
        .filter_map(|m| m.position.map(|p| ((p.lon, p.lat), rgb(m.rgb))))
        .collect();
    let selected = app
        .selected_marker()
        .and_then(|m| m.position.map(|p| (p.lon, p.lat, m.title.clone())));
    let center = (app.viewport.center.lon, app.viewport.center.lat);
    let here = app.current_location.map(|p| (p.lon, p.lat));

    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            ctx.draw(&Map {
                resolution: MapResolution::High,
                color: Color::DarkGray,
            });
            ctx.layer();
            for (coords, color) in &points {
                ctx.draw(&Points {
                    coords: std::slice::from_ref(coords),
                    color: *color,
                });
            }
            ctx.print(center.0, center.1, Span::styled("+", Style::default().fg(Color::DarkGray)));
            if let Some((x, y)) = here {
                ctx.print(
                    x,
                    y,
                    Span::styled("◎ Current location", Style::default().fg(Color::Cyan)),
                );
            }
            if let Some((x, y, title)) = &selected {
                ctx.print(
                    *x,
                    *y,
                    Span::styled(
                        format!("◉ {}", title),
                        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                    ),
                );
            }
        });

    frame.render_widget(canvas, area);
}

/// Render the marker list on the right
pub fn render_marker_list(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" Markers ({}) ", app.markers.len());

    if app.markers.is_empty() {
        let empty = Paragraph::new("No markers. Press 'r' to reload or pick a category with 1-5.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .markers
        .iter()
        .map(|m| {
            ListItem::new(Line::from(vec![
                Span::styled("● ", Style::default().fg(rgb(m.rgb))),
                Span::raw(m.label()),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(app.selected);

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::Black));
    frame.render_stateful_widget(list, area, &mut state);
}

/// Render the status bar at the bottom
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (text, style) = match &app.notification {
        Some(n) => {
            let color = match n.kind {
                NotificationKind::Info => Color::White,
                NotificationKind::Success => Color::Green,
                NotificationKind::Warning => Color::Yellow,
                NotificationKind::Error => Color::Red,
            };
            (format!(" {} ", n.message), Style::default().bg(Color::DarkGray).fg(color))
        }
        None => (
            format!(
                " {:.6}, {:.6} | zoom {} | {} markers | ★ {}/{} | [h: Help] ",
                app.viewport.center.lat,
                app.viewport.center.lon,
                app.viewport.zoom,
                app.markers.len(),
                app.favorite_count,
                app.favorites.config().max_favorites,
            ),
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
    };

    let status_bar = Paragraph::new(text).style(style).alignment(Alignment::Center);
    frame.render_widget(status_bar, area);
}

/// Render the popup of the selected marker
pub fn render_popup(frame: &mut Frame, app: &App, area: Rect) {
    let Some(marker) = app.selected_marker() else {
        return;
    };

    let mut lines = vec![Line::from(Span::styled(
        marker.title.clone(),
        Style::default().fg(rgb(marker.rgb)).add_modifier(Modifier::BOLD),
    ))];
    lines.extend(marker.popup_lines.iter().map(|l| Line::from(l.clone())));
    lines.push(Line::from(""));
    let hint = if marker.is_favorite {
        "★ Favorite  [f: Remove] [Esc: Close]"
    } else {
        "[f: Add to favorites] [Esc: Close]"
    };
    lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))));

    let width = 50.min(area.width);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup_area = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + 1,
        width,
        height,
    );

    let popup = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).style(Style::default().bg(Color::Black)))
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

/// Render import overlay to input a file path
pub fn render_import_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(20), Constraint::Percentage(40)])
        .split(area);

    let area_mid = popup_layout[1];
    let inner = Rect {
        x: area_mid.x + 1,
        y: area_mid.y + 1,
        width: area_mid.width.saturating_sub(2),
        height: area_mid.height.saturating_sub(2),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Import Favorites (replaces current list, Enter to confirm) ");
    frame.render_widget(Clear, area_mid);
    frame.render_widget(block, area_mid);

    let input = Paragraph::new(Text::from(format!("Path: {}", app.import_input)))
        .style(Style::default().fg(Color::White))
        .block(Block::default());
    frame.render_widget(input, inner);
}

pub fn render_clear_confirmation(frame: &mut Frame, app: &App, area: Rect) {
    let popup_width = 60.min(area.width);
    let popup_height = 5.min(area.height);

    let x = (area.width.saturating_sub(popup_width)) / 2;
    let y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(x, y, popup_width, popup_height);

    let text = format!("Remove all {} favorites? (y/n)", app.favorite_count);
    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .title("Confirm")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Yellow)),
        )
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Center);

    frame.render_widget(Clear, popup_area);
    frame.render_widget(paragraph, popup_area);
}

/// Render the help screen overlay
pub fn render_help_screen(frame: &mut Frame, app: &App, size: Rect) {
    let keys = &app.config.keymap;
    let heading = |text: &'static str| {
        Line::from(Span::styled(text, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)))
    };
    let entry = |key: &str, action: &str| Line::from(format!("{:<12} {}", key, action));

    let help_text = vec![
        Line::from(""),
        heading("Map"),
        entry("←/→/↑/↓", "Pan"),
        entry(&format!("{}/{}", keys.zoom_in, keys.zoom_out), "Zoom in/out"),
        entry(&keys.recenter, "Back to the default centre"),
        entry(&keys.location, "Back to the current location"),
        entry(&keys.refresh, "Reload data"),
        Line::from(""),
        heading("Categories"),
        entry("1-5", "AED, medical, Wi-Fi, evacuation, toilet"),
        Line::from(""),
        heading("Markers"),
        entry(&format!("{}/{}", keys.next_marker, keys.prev_marker), "Select next/previous"),
        entry(&keys.open_popup, "Show/hide details"),
        entry("Esc", "Close details"),
        Line::from(""),
        heading("Favorites"),
        entry(&keys.toggle_favorite, "Add/remove selected marker"),
        entry(&keys.favorites_view, "Show favorites"),
        entry(&keys.export, "Export to JSON"),
        entry(&keys.import, "Import from JSON"),
        entry(&keys.clear_favorites, "Remove all favorites"),
        Line::from(""),
        heading("Interface"),
        entry(&keys.help, "Show this help"),
        entry(&keys.quit, "Quit application"),
        Line::from(""),
        Line::from(Span::styled("Press 'Esc' to close", Style::default().fg(Color::DarkGray))),
    ];

    let popup_width = 60.min(size.width);
    let popup_height = (help_text.len() as u16 + 2).min(size.height);
    let x = (size.width.saturating_sub(popup_width)) / 2;
    let y = (size.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(x, y, popup_width, popup_height);

    let block = Block::default()
        .title(" Help - Keyboard Shortcuts ")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::Black));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(block, popup_area);

    let inner = Rect {
        x: popup_area.x + 1,
        y: popup_area.y + 1,
        width: popup_area.width.saturating_sub(2),
        height: popup_area.height.saturating_sub(2),
    };

    let paragraph = Paragraph::new(help_text)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, inner);
}
