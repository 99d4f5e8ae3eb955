use anyhow::Result;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use poimap_core::models::Category;
use std::time::Duration;
use tracing::debug;

use crate::app::App;
use crate::config::key_matches;

/// Terminal events
#[derive(Debug, Clone, Copy)]
pub enum Event {
    /// Key press event
    Key(KeyEvent),
    /// Terminal tick event
    Tick,
    /// Mouse event
    Mouse(MouseEvent),
}

/// Event handler for the terminal
pub struct EventHandler {
    /// Tick rate in milliseconds
    tick_rate: Duration,
}

impl EventHandler {
    /// Create a new event handler
    pub fn new(tick_rate_ms: u64) -> Self {
        Self {
            tick_rate: Duration::from_millis(tick_rate_ms),
        }
    }

    /// Poll for the next event
    pub fn next(&self) -> Result<Event> {
        if event::poll(self.tick_rate)? {
            match event::read()? {
                CEvent::Key(key) => return Ok(Event::Key(key)),
                CEvent::Mouse(m) => return Ok(Event::Mouse(m)),
                _ => {}
            }
        }
        Ok(Event::Tick)
    }
}

/// Handle key events for the application
pub fn handle_key_event(key: KeyEvent, app: &mut App) {
    // On Windows, crossterm reports both key press and release events.
    // We only want to handle press events to avoid duplicates.
    if key.kind != KeyEventKind::Press {
        return;
    }

    // Import overlay takes precedence
    if app.import_overlay_open {
        match key.code {
            KeyCode::Esc => app.close_import_overlay(),
            KeyCode::Enter => {
                if let Err(err) = app.confirm_import() {
                    debug!(error = %err, "import from overlay failed");
                }
            }
            KeyCode::Backspace => app.backspace_import_input(),
            KeyCode::Char(c) => {
                // Allow AltGr combinations (CONTROL+ALT) for special characters
                if !key.modifiers.contains(KeyModifiers::CONTROL) || key.modifiers.contains(KeyModifiers::ALT) {
                    app.update_import_input(c);
                }
            }
            _ => {}
        }
        return;
    }

    if app.confirming_clear {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Err(err) = app.confirm_clear_favorites() {
                    debug!(error = %err, "clearing favorites failed");
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => app.cancel_clear_favorites(),
            _ => {}
        }
        return;
    }

    // Help screen takes precedence
    if app.help_open {
        if key.code == KeyCode::Esc || key_matches(&app.config.keymap.help, &key) {
            app.close_help();
        }
        return;
    }

    // Fixed keys: category selection and panning
    match key.code {
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            app.select_category(Category::ALL[index]);
            return;
        }
        KeyCode::Left => return app.pan(-1, 0),
        KeyCode::Right => return app.pan(1, 0),
        KeyCode::Up => return app.pan(0, 1),
        KeyCode::Down => return app.pan(0, -1),
        KeyCode::Esc => return app.close_popup(),
        _ => {}
    }

    let keymap = app.config.keymap.clone();
    if key_matches(&keymap.quit, &key) {
        app.quit();
    } else if key_matches(&keymap.help, &key) {
        app.open_help();
    } else if key_matches(&keymap.refresh, &key) {
        app.refresh();
    } else if key_matches(&keymap.zoom_in, &key) || key.code == KeyCode::Char('=') {
        app.zoom_in();
    } else if key_matches(&keymap.zoom_out, &key) {
        app.zoom_out();
    } else if key_matches(&keymap.next_marker, &key) {
        app.select_next_marker();
    } else if key_matches(&keymap.prev_marker, &key) {
        app.select_prev_marker();
    } else if key_matches(&keymap.open_popup, &key) {
        app.toggle_popup();
    } else if key_matches(&keymap.toggle_favorite, &key) {
        app.toggle_favorite_selected();
    } else if key_matches(&keymap.favorites_view, &key) {
        app.toggle_favorites_view();
    } else if key_matches(&keymap.recenter, &key) {
        app.recenter();
    } else if key_matches(&keymap.location, &key) {
        app.show_current_location();
    } else if key_matches(&keymap.export, &key) {
        if let Err(err) = app.export_favorites() {
            debug!(error = %err, "export failed");
        }
    } else if key_matches(&keymap.import, &key) {
        app.open_import_overlay();
    } else if key_matches(&keymap.clear_favorites, &key) {
        app.request_clear_favorites();
    }
}

/// Mouse wheel zooms the map
pub fn handle_mouse_event(mouse: MouseEvent, app: &mut App) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in(),
        MouseEventKind::ScrollDown => app.zoom_out(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use poimap_core::geo::LatLng;
    use poimap_core::models::PoiFeature;
    use poimap_core::api::PoiSource;
    use tempfile::{tempdir, TempDir};

    struct EmptySource;

    impl PoiSource for EmptySource {
        fn fetch(&self, _category: Category, _center: LatLng) -> poimap_core::Result<Vec<PoiFeature>> {
            Ok(Vec::new())
        }
    }

    fn setup() -> (App, TempDir) {
        let dir = tempdir().unwrap();
        let app = App::with_source(&dir.path().join("poimap.db"), Config::default(), Box::new(EmptySource)).unwrap();
        (app, dir)
    }

    fn press(app: &mut App, code: KeyCode) {
        handle_key_event(KeyEvent::new(code, KeyModifiers::NONE), app);
    }

    #[test]
    fn test_event_handler_creation() {
        let handler = EventHandler::new(250);
        assert_eq!(handler.tick_rate, Duration::from_millis(250));
    }

    #[test]
    fn test_category_keys() {
        let (mut app, _dir) = setup();
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.category, Category::FreeWifi);
        press(&mut app, KeyCode::Char('5'));
        assert_eq!(app.category, Category::Toilet);
    }

    #[test]
    fn test_zoom_and_quit_keys() {
        let (mut app, _dir) = setup();
        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.viewport.zoom, 17);
        press(&mut app, KeyCode::Char('-'));
        assert_eq!(app.viewport.zoom, 16);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_help_overlay_swallows_keys() {
        let (mut app, _dir) = setup();
        press(&mut app, KeyCode::Char('h'));
        assert!(app.help_open);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);
        press(&mut app, KeyCode::Esc);
        assert!(!app.help_open);
    }

    #[test]
    fn test_import_overlay_collects_input() {
        let (mut app, _dir) = setup();
        press(&mut app, KeyCode::Char('i'));
        assert!(app.import_overlay_open);
        for c in "a.jsonx".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.import_input, "a.json");
        press(&mut app, KeyCode::Esc);
        assert!(!app.import_overlay_open);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_clear_requires_confirmation() {
        let (mut app, _dir) = setup();
        handle_key_event(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL), &mut app);
        assert!(app.confirming_clear);
        press(&mut app, KeyCode::Char('n'));
        assert!(!app.confirming_clear);
    }

    #[test]
    fn test_location_key() {
        let (mut app, _dir) = setup();
        let here = LatLng::new(34.0, 131.0);
        app.set_current_location(here);
        press(&mut app, KeyCode::Char('c'));
        assert_ne!(app.viewport.center, here);
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.viewport.center, here);
    }

    #[test]
    fn test_failed_import_keeps_running() {
        let (mut app, dir) = setup();
        press(&mut app, KeyCode::Char('i'));
        app.import_input = dir.path().join("missing.json").to_string_lossy().to_string();
        press(&mut app, KeyCode::Enter);
        assert!(!app.import_overlay_open);
        assert!(app.notification.as_ref().unwrap().message.starts_with("Import failed"));
    }

    #[test]
    fn test_release_events_ignored() {
        let (mut app, _dir) = setup();
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        handle_key_event(key, &mut app);
        assert!(!app.should_quit);
    }
}
