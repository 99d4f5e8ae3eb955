use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

use super::{
    render_clear_confirmation, render_header, render_help_screen, render_import_overlay, render_map,
    render_marker_list, render_popup, render_status_bar,
};

/// Render the complete UI
pub fn render(frame: &mut Frame, app: &mut App) {
    let size = frame.size();

    // Create main layout: header, content, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(size);

    render_header(frame, app, chunks[0]);
    render_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Overlays (drawn last)
    if app.popup_open {
        render_popup(frame, app, chunks[1]);
    }
    if app.import_overlay_open {
        render_import_overlay(frame, app, size);
    }
    if app.confirming_clear {
        render_clear_confirmation(frame, app, size);
    }
    if app.help_open {
        render_help_screen(frame, app, size);
    }
}

/// Map on the left, marker list on the right
fn render_content(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Map
            Constraint::Length(36), // Marker list
        ])
        .split(area);

    render_map(frame, app, main_chunks[0]);
    render_marker_list(frame, app, main_chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use poimap_core::api::PoiSource;
    use poimap_core::geo::LatLng;
    use poimap_core::models::{Category, PoiFeature};
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;
    use tempfile::tempdir;

    struct OneFeature;

    impl PoiSource for OneFeature {
        fn fetch(&self, _category: Category, _center: LatLng) -> poimap_core::Result<Vec<PoiFeature>> {
            Ok(serde_json::from_value(json!([
                {"properties": {"resource_id": "1", "name": "Station AED", "address": "Hakata"},
                 "geometry": {"coordinates": [130.351903, 33.5902]}}
            ]))
            .unwrap())
        }
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_render_records_map_area() {
        let dir = tempdir().unwrap();
        let mut app = App::with_source(&dir.path().join("poimap.db"), Config::default(), Box::new(OneFeature)).unwrap();
        app.move_end();
        app.select_next_marker();
        app.open_popup();

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();

        // Map gets everything but the header, status bar, borders and list
        assert_eq!(app.map_area, Rect::new(1, 4, 82, 34));
        assert!(screen_text(&terminal).contains("Station AED"));

        app.open_help();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("Keyboard Shortcuts"));
    }

    #[test]
    fn test_current_location_is_drawn() {
        let dir = tempdir().unwrap();
        let mut app = App::with_source(&dir.path().join("poimap.db"), Config::default(), Box::new(OneFeature)).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(!screen_text(&terminal).contains("Current location"));

        app.set_current_location(LatLng::new(33.5902, 130.351903));
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("Current location"));
    }
}
