//! Great-circle distance and the pan-distance refetch gate.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default distance the viewport must move before data is reloaded
pub const DEFAULT_REFETCH_THRESHOLD_M: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn distance_to(&self, other: &LatLng) -> f64 {
        haversine_distance(*self, *other)
    }
}

/// Haversine distance in metres
pub fn haversine_distance(a: LatLng, b: LatLng) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Decides whether a map move should trigger a data reload.
///
/// Remembers the centre of the last load. While a popup is opening the gate
/// stays shut, since opening a popup may auto-pan the map.
#[derive(Debug, Clone)]
pub struct RefetchGate {
    threshold_m: f64,
    last_loaded: Option<LatLng>,
    popup_opening: bool,
}

impl RefetchGate {
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_m: threshold_m.max(0.0),
            last_loaded: None,
            popup_opening: false,
        }
    }

    pub fn should_refetch(&self, center: LatLng) -> bool {
        if self.popup_opening {
            return false;
        }
        match self.last_loaded {
            None => true,
            Some(last) => haversine_distance(last, center) >= self.threshold_m,
        }
    }

    /// Record the centre a load was issued for
    pub fn mark_loaded(&mut self, center: LatLng) {
        self.last_loaded = Some(center);
    }

    pub fn set_popup_opening(&mut self, opening: bool) {
        self.popup_opening = opening;
    }
}

impl Default for RefetchGate {
    fn default() -> Self {
        Self::new(DEFAULT_REFETCH_THRESHOLD_M)
    }
}
