use anyhow::{bail, Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use poimap_core::api::{ApiConfig, DEFAULT_BASE_URL, DEFAULT_MAX_RESULTS, DEFAULT_SEARCH_RADIUS_M};
use poimap_core::geo::{LatLng, DEFAULT_REFETCH_THRESHOLD_M};
use poimap_core::storage::{FavoritesConfig, DEFAULT_FAVORITES_SLOT, MAX_FAVORITES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Keymap {
    pub quit: String,
    pub help: String,
    pub refresh: String,
    pub zoom_in: String,
    pub zoom_out: String,
    pub next_marker: String,
    pub prev_marker: String,
    pub open_popup: String,
    pub toggle_favorite: String,
    pub favorites_view: String,
    pub recenter: String,
    pub location: String,
    pub export: String,
    pub import: String,
    pub clear_favorites: String,
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            quit: "q".to_string(),
            help: "h".to_string(),
            refresh: "r".to_string(),
            zoom_in: "+".to_string(),
            zoom_out: "-".to_string(),
            next_marker: "n".to_string(),
            prev_marker: "p".to_string(),
            open_popup: "enter".to_string(),
            toggle_favorite: "f".to_string(),
            favorites_view: "v".to_string(),
            recenter: "c".to_string(),
            location: "l".to_string(),
            export: "e".to_string(),
            import: "i".to_string(),
            clear_favorites: "ctrl-d".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MapSettings {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            center_lat: 33.590200,
            center_lon: 130.351903,
            zoom: 16,
            min_zoom: 10,
            max_zoom: 19,
        }
    }
}

impl MapSettings {
    pub fn center(&self) -> LatLng {
        LatLng::new(self.center_lat, self.center_lon)
    }

    /// `zoom` limited to `min_zoom..=max_zoom`
    pub fn clamp_zoom(&self, zoom: u8) -> u8 {
        zoom.max(self.min_zoom).min(self.max_zoom)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_zoom > self.max_zoom {
            bail!(
                "map.min_zoom ({}) is greater than map.max_zoom ({})",
                self.min_zoom,
                self.max_zoom
            );
        }
        if !(-90.0..=90.0).contains(&self.center_lat) || !(-180.0..=180.0).contains(&self.center_lon) {
            bail!(
                "map centre {}, {} is not a valid coordinate",
                self.center_lat,
                self.center_lon
            );
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub search_radius_m: u32,
    pub max_results: u32,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
            max_results: DEFAULT_MAX_RESULTS,
            timeout_secs: 10,
        }
    }
}

impl ApiSettings {
    pub fn to_api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            search_radius_m: self.search_radius_m,
            max_results: self.max_results,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FavoritesSettings {
    pub slot: String,
    pub max_favorites: usize,
}

impl Default for FavoritesSettings {
    fn default() -> Self {
        Self {
            slot: DEFAULT_FAVORITES_SLOT.to_string(),
            max_favorites: MAX_FAVORITES,
        }
    }
}

impl FavoritesSettings {
    pub fn to_favorites_config(&self) -> FavoritesConfig {
        FavoritesConfig {
            slot: self.slot.clone(),
            max_favorites: self.max_favorites,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RefetchSettings {
    /// Distance in metres the map centre must move before reloading
    pub threshold_m: f64,
}

impl Default for RefetchSettings {
    fn default() -> Self {
        Self {
            threshold_m: DEFAULT_REFETCH_THRESHOLD_M,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub keymap: Keymap,
    pub map: MapSettings,
    pub api: ApiSettings,
    pub favorites: FavoritesSettings,
    pub refetch: RefetchSettings,
}

/// Read the config file, writing the defaults first if it does not exist
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        let config = Config::default();
        let toml = toml::to_string(&config)?;
        fs::write(path, toml)
            .with_context(|| format!("Failed to write default config to {}", path.display()))?;
        info!(path = %path.display(), "wrote default config");
        return Ok(config);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .map
        .validate()
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

/// Whether `key` is the binding written as e.g. `q`, `enter` or `ctrl-d`
pub fn key_matches(binding: &str, key: &KeyEvent) -> bool {
    let binding = binding.trim().to_lowercase();
    let (wants_ctrl, name) = match binding.strip_prefix("ctrl-") {
        Some(rest) if !rest.is_empty() => (true, rest),
        _ => (false, binding.as_str()),
    };

    if wants_ctrl != key.modifiers.contains(KeyModifiers::CONTROL) {
        return false;
    }

    match (name, key.code) {
        ("enter", KeyCode::Enter) => true,
        ("esc", KeyCode::Esc) => true,
        ("tab", KeyCode::Tab) => true,
        ("space", KeyCode::Char(' ')) => true,
        (_, KeyCode::Char(c)) => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(expected), None) => c.to_ascii_lowercase() == expected,
                _ => false,
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_default_config_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = load_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.map.zoom, 16);
        assert_eq!(config.favorites.max_favorites, 100);

        let reloaded = load_config(&path).unwrap();
        assert_eq!(reloaded.api, config.api);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[refetch]\nthreshold_m = 250.0\n\n[keymap]\nquit = \"x\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.refetch.threshold_m, 250.0);
        assert_eq!(config.keymap.quit, "x");
        assert_eq!(config.keymap.help, "h");
        assert_eq!(config.map, MapSettings::default());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "map = 5").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_inverted_zoom_bounds_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[map]\nmin_zoom = 15\nmax_zoom = 12\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("min_zoom (15) is greater than map.max_zoom (12)"));
    }

    #[test]
    fn test_out_of_range_centre_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[map]\ncenter_lat = 130.35\ncenter_lon = 33.59\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_clamp_zoom_never_panics() {
        let inverted = MapSettings {
            min_zoom: 15,
            max_zoom: 12,
            ..Default::default()
        };
        assert_eq!(inverted.clamp_zoom(16), 12);

        let map = MapSettings::default();
        assert_eq!(map.clamp_zoom(3), 10);
        assert_eq!(map.clamp_zoom(25), 19);
        assert_eq!(map.clamp_zoom(15), 15);
    }

    #[test]
    fn test_key_matches() {
        assert!(key_matches("q", &key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(key_matches("q", &key(KeyCode::Char('Q'), KeyModifiers::SHIFT)));
        assert!(!key_matches("q", &key(KeyCode::Char('q'), KeyModifiers::CONTROL)));
        assert!(key_matches("ctrl-d", &key(KeyCode::Char('d'), KeyModifiers::CONTROL)));
        assert!(!key_matches("ctrl-d", &key(KeyCode::Char('d'), KeyModifiers::NONE)));
        assert!(key_matches("enter", &key(KeyCode::Enter, KeyModifiers::NONE)));
        assert!(key_matches("+", &key(KeyCode::Char('+'), KeyModifiers::SHIFT)));
        assert!(!key_matches("enter", &key(KeyCode::Char('e'), KeyModifiers::NONE)));
    }

    #[test]
    fn test_settings_conversion() {
        let api = ApiSettings {
            timeout_secs: 3,
            ..Default::default()
        };
        assert_eq!(api.to_api_config().timeout, Duration::from_secs(3));
        assert_eq!(
            FavoritesSettings::default().to_favorites_config(),
            FavoritesConfig::default()
        );
    }
}
