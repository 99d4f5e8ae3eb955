use anyhow::Result;
use poimap_core::{
    api::{PoiClient, PoiSource},
    geo::{LatLng, RefetchGate},
    models::Category,
    storage::{Database, FavoriteRepository, SqliteSlotStore},
};
use ratatui::layout::Rect;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::markers::{build_markers, favorite_markers, Marker};

const NOTIFICATION_TTL: Duration = Duration::from_secs(4);
const FALLBACK_MAP_AREA: Rect = Rect {
    x: 0,
    y: 0,
    width: 80,
    height: 24,
};
const MAX_LATITUDE: f64 = 85.0;
/// Zoom used when jumping to the current location
const LOCATION_ZOOM: u8 = 15;

/// Visible part of the map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
}

impl Viewport {
    /// Longitude degrees covered by one terminal column
    pub fn degrees_per_column(&self) -> f64 {
        360.0 / (2f64.powi(self.zoom as i32) * 32.0)
    }

    /// `(lon, lat)` bounds for a map drawn into `width` x `height` cells
    pub fn bounds(&self, width: u16, height: u16) -> ([f64; 2], [f64; 2]) {
        let step = self.degrees_per_column();
        let lon_half = step * width.max(1) as f64 / 2.0;
        // A cell is about twice as tall as it is wide
        let lat_half = step * height.max(1) as f64 * self.center.lat.to_radians().cos();
        (
            [self.center.lon - lon_half, self.center.lon + lon_half],
            [self.center.lat - lat_half, self.center.lat + lat_half],
        )
    }

    pub fn contains(&self, point: LatLng, width: u16, height: u16) -> bool {
        let (x, y) = self.bounds(width, height);
        (x[0]..=x[1]).contains(&point.lon) && (y[0]..=y[1]).contains(&point.lat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub shown_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Fetched POIs of the current category
    Category,
    /// Stored favorites of every category
    Favorites,
}

/// Application state
pub struct App {
    pub should_quit: bool,
    pub config: Config,
    pub category: Category,
    pub view: ViewMode,
    pub viewport: Viewport,
    /// Area the map was last drawn into
    pub map_area: Rect,
    pub markers: Vec<Marker>,
    pub selected: Option<usize>,
    pub popup_open: bool,
    pub gate: RefetchGate,
    /// Where the user is, when known
    pub current_location: Option<LatLng>,
    pub favorites: FavoriteRepository<SqliteSlotStore>,
    pub favorite_count: usize,
    pub notification: Option<Notification>,
    pub help_open: bool,
    pub import_overlay_open: bool,
    pub import_input: String,
    pub confirming_clear: bool,
    pub workspace_dir: PathBuf,
    source: Box<dyn PoiSource>,
}

impl App {
    /// Create an App talking to the configured upstream API
    pub fn new(db_path: &Path, config: Config) -> Result<Self> {
        let client = PoiClient::new(config.api.to_api_config())?;
        Self::with_source(db_path, config, Box::new(client))
    }

    /// Create an App fetching from `source`
    pub fn with_source(db_path: &Path, config: Config, source: Box<dyn PoiSource>) -> Result<Self> {
        let db = Database::new(db_path);
        let store = SqliteSlotStore::open(&db)?;
        let favorites = FavoriteRepository::with_config(store, config.favorites.to_favorites_config());
        let favorite_count = favorites.count();
        let workspace_dir = db_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        info!(db = %db_path.display(), favorites = favorite_count, "session started");

        Ok(Self {
            should_quit: false,
            category: Category::default(),
            view: ViewMode::Category,
            viewport: Viewport {
                center: config.map.center(),
                zoom: config.map.clamp_zoom(config.map.zoom),
            },
            map_area: Rect::default(),
            markers: Vec::new(),
            selected: None,
            popup_open: false,
            gate: RefetchGate::new(config.refetch.threshold_m),
            current_location: None,
            favorites,
            favorite_count,
            notification: None,
            help_open: false,
            import_overlay_open: false,
            import_input: String::new(),
            confirming_clear: false,
            workspace_dir,
            config,
            source,
        })
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: NotificationKind) {
        let message = message.into();
        match kind {
            NotificationKind::Error => warn!(%message, "notification"),
            _ => debug!(%message, "notification"),
        }
        self.notification = Some(Notification {
            message,
            kind,
            shown_at: Instant::now(),
        });
    }

    /// Handle tick events
    pub fn tick(&mut self) {
        if let Some(n) = &self.notification {
            if n.shown_at.elapsed() >= NOTIFICATION_TTL {
                self.notification = None;
            }
        }
    }

    /// Quit the application
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    fn effective_map_area(&self) -> Rect {
        if self.map_area.width == 0 || self.map_area.height == 0 {
            FALLBACK_MAP_AREA
        } else {
            self.map_area
        }
    }

    // =========================
    // Data loading
    // =========================

    /// Fetch the current category around the map centre and rebuild the
    /// markers. In the favorites view the stored favorites are shown instead.
    pub fn load_data(&mut self) {
        self.selected = None;
        self.popup_open = false;

        if self.view == ViewMode::Favorites {
            self.show_favorites();
            return;
        }

        let category = self.category;
        let center = self.viewport.center;
        self.gate.mark_loaded(center);
        self.notify(format!("Loading {}...", category.display_name()), NotificationKind::Info);

        match self.source.fetch(category, center) {
            Ok(features) => {
                let favorites = self.favorites.load_all();
                self.favorite_count = favorites.len();
                self.markers = build_markers(&features, category, &self.favorites, &favorites);
                if self.markers.is_empty() {
                    self.notify(
                        format!("No {} found nearby", category.display_name()),
                        NotificationKind::Warning,
                    );
                } else {
                    self.notify(
                        format!("Showing {} x {}", self.markers.len(), category.display_name()),
                        NotificationKind::Success,
                    );
                }
            }
            Err(err) => {
                self.markers.clear();
                self.notify(
                    format!("Failed to fetch {}: {}", category.display_name(), err),
                    NotificationKind::Error,
                );
            }
        }
    }

    /// Called after every pan or zoom
    pub fn move_end(&mut self) {
        if self.view == ViewMode::Favorites {
            return;
        }
        if self.gate.should_refetch(self.viewport.center) {
            self.load_data();
        } else {
            debug!("map moved less than the refetch threshold");
        }
    }

    pub fn select_category(&mut self, category: Category) {
        info!(category = %category, "category selected");
        self.category = category;
        self.view = ViewMode::Category;
        self.load_data();
    }

    pub fn refresh(&mut self) {
        self.load_data();
    }

    // =========================
    // Map movement
    // =========================

    /// Move the centre by a quarter of the visible area per step
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let area = self.effective_map_area();
        let (x, y) = self.viewport.bounds(area.width, area.height);
        let center = &mut self.viewport.center;
        center.lon = (center.lon + (x[1] - x[0]) / 4.0 * dx as f64).clamp(-180.0, 180.0);
        center.lat = (center.lat + (y[1] - y[0]) / 4.0 * dy as f64).clamp(-MAX_LATITUDE, MAX_LATITUDE);
        self.move_end();
    }

    pub fn zoom_in(&mut self) {
        if self.viewport.zoom < self.config.map.max_zoom {
            self.viewport.zoom += 1;
            self.move_end();
        }
    }

    pub fn zoom_out(&mut self) {
        if self.viewport.zoom > self.config.map.min_zoom {
            self.viewport.zoom -= 1;
            self.move_end();
        }
    }

    /// Back to the configured default centre
    pub fn recenter(&mut self) {
        self.viewport.center = self.config.map.center();
        self.viewport.zoom = self.config.map.clamp_zoom(self.config.map.zoom);
        self.move_end();
    }

    /// Record where the user is and centre the map there. Takes effect on
    /// the next move-end.
    pub fn set_current_location(&mut self, location: LatLng) {
        info!(lat = location.lat, lon = location.lon, "current location set");
        self.current_location = Some(location);
        self.viewport.center = location;
        self.viewport.zoom = self.config.map.clamp_zoom(LOCATION_ZOOM);
    }

    /// Jump back to the current location; without one the map stays put
    pub fn show_current_location(&mut self) {
        let Some(location) = self.current_location else {
            self.notify(
                "Current location unknown. Start with --lat and --lon to set it",
                NotificationKind::Error,
            );
            return;
        };

        self.viewport.center = location;
        self.viewport.zoom = self.config.map.clamp_zoom(LOCATION_ZOOM);
        self.notify("Showing current location", NotificationKind::Success);
        self.move_end();
    }

    // =========================
    // Marker selection & popup
    // =========================

    pub fn selected_marker(&self) -> Option<&Marker> {
        self.selected.and_then(|i| self.markers.get(i))
    }

    pub fn select_next_marker(&mut self) {
        if self.markers.is_empty() {
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) => (i + 1) % self.markers.len(),
            None => 0,
        });
    }

    pub fn select_prev_marker(&mut self) {
        if self.markers.is_empty() {
            return;
        }
        self.selected = Some(match self.selected {
            Some(0) | None => self.markers.len() - 1,
            Some(i) => i - 1,
        });
    }

    /// Open the popup of the selected marker, bringing the marker into view.
    /// The move does not count as a user move for reloading.
    pub fn open_popup(&mut self) {
        let position = match self.selected_marker() {
            Some(marker) => marker.position,
            None => return,
        };

        if let Some(position) = position {
            self.gate.set_popup_opening(true);
            let area = self.effective_map_area();
            if !self.viewport.contains(position, area.width, area.height) {
                self.viewport.center = position;
                self.move_end();
            }
            self.gate.set_popup_opening(false);
        }
        self.popup_open = true;
    }

    pub fn close_popup(&mut self) {
        self.popup_open = false;
    }

    pub fn toggle_popup(&mut self) {
        if self.popup_open {
            self.close_popup();
        } else {
            self.open_popup();
        }
    }

    // =========================
    // Favorites
    // =========================

    /// Add or remove the selected marker
    pub fn toggle_favorite_selected(&mut self) {
        let Some(marker) = self.selected_marker().cloned() else {
            self.notify("Select a marker first", NotificationKind::Info);
            return;
        };

        let result = if marker.is_favorite {
            self.favorites
                .remove(&marker.lookup())
                .map(|_| format!("Removed {} from favorites", marker.title))
        } else {
            self.favorites
                .add(&marker.candidate)
                .map(|_| format!("Added {} to favorites", marker.title))
        };

        match result {
            Ok(message) => self.notify(message, NotificationKind::Success),
            Err(err) => self.notify(err.to_string(), NotificationKind::Error),
        }

        if self.view == ViewMode::Favorites {
            self.show_favorites();
        } else {
            self.refresh_favorite_flags();
        }
    }

    /// Recompute the favorite flag of every marker
    pub fn refresh_favorite_flags(&mut self) {
        let favorites = self.favorites.load_all();
        self.favorite_count = favorites.len();
        for marker in &mut self.markers {
            marker.is_favorite = self.favorites.is_favorite(&marker.lookup(), Some(&favorites));
        }
    }

    fn show_favorites(&mut self) {
        let favorites = self.favorites.load_all();
        self.favorite_count = favorites.len();
        self.markers = favorite_markers(&favorites);
        if self.selected.map_or(false, |i| i >= self.markers.len()) {
            self.selected = self.markers.len().checked_sub(1);
            self.popup_open = false;
        }
    }

    pub fn toggle_favorites_view(&mut self) {
        self.selected = None;
        self.popup_open = false;
        match self.view {
            ViewMode::Category => {
                self.view = ViewMode::Favorites;
                self.show_favorites();
                let message = format!("{} favorites", self.favorite_count);
                self.notify(message, NotificationKind::Info);
            }
            ViewMode::Favorites => {
                self.view = ViewMode::Category;
                self.load_data();
            }
        }
    }

    pub fn export_path(&self) -> PathBuf {
        let date = chrono::Local::now().format("%Y%m%d");
        self.workspace_dir.join(format!("poimap_favorites_{}.json", date))
    }

    /// Write all favorites to `export_path()`
    pub fn export_favorites(&mut self) -> Result<PathBuf> {
        let path = self.export_path();
        let outcome = self
            .favorites
            .export_json()
            .map_err(anyhow::Error::from)
            .and_then(|json| std::fs::write(&path, json).map_err(anyhow::Error::from));

        match outcome {
            Ok(()) => {
                info!(path = %path.display(), "favorites exported");
                self.notify(format!("Exported favorites to {}", path.display()), NotificationKind::Success);
                Ok(path)
            }
            Err(err) => {
                self.notify(format!("Export failed: {}", err), NotificationKind::Error);
                Err(err)
            }
        }
    }

    pub fn open_import_overlay(&mut self) {
        self.import_overlay_open = true;
        self.import_input.clear();
    }

    pub fn close_import_overlay(&mut self) {
        self.import_overlay_open = false;
        self.import_input.clear();
    }

    pub fn update_import_input(&mut self, ch: char) {
        self.import_input.push(ch);
    }

    pub fn backspace_import_input(&mut self) {
        self.import_input.pop();
    }

    /// Replace the favorites with the JSON file typed into the overlay
    pub fn confirm_import(&mut self) -> Result<usize> {
        let path = PathBuf::from(self.import_input.trim());
        self.close_import_overlay();

        let outcome = std::fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|text| self.favorites.import_json(&text).map_err(anyhow::Error::from));

        match outcome {
            Ok(count) => {
                self.notify(format!("Imported {} favorites", count), NotificationKind::Success);
                self.after_favorites_replaced();
                Ok(count)
            }
            Err(err) => {
                self.notify(format!("Import failed: {}", err), NotificationKind::Error);
                Err(err)
            }
        }
    }

    pub fn request_clear_favorites(&mut self) {
        self.confirming_clear = true;
    }

    pub fn cancel_clear_favorites(&mut self) {
        self.confirming_clear = false;
    }

    pub fn confirm_clear_favorites(&mut self) -> Result<()> {
        self.confirming_clear = false;
        match self.favorites.clear_all() {
            Ok(()) => {
                self.notify("All favorites removed", NotificationKind::Success);
                self.after_favorites_replaced();
                Ok(())
            }
            Err(err) => {
                self.notify(format!("Clearing favorites failed: {}", err), NotificationKind::Error);
                Err(err.into())
            }
        }
    }

    fn after_favorites_replaced(&mut self) {
        if self.view == ViewMode::Favorites {
            self.selected = None;
            self.popup_open = false;
            self.show_favorites();
        } else {
            self.refresh_favorite_flags();
        }
    }

    pub fn open_help(&mut self) {
        self.help_open = true;
    }

    pub fn close_help(&mut self) {
        self.help_open = false;
    }
}
