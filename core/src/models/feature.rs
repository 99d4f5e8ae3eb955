use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::favorite_key::{coerce_number, value_to_text};
use super::{Category, FavoriteCandidate, UNKNOWN_NAME};
use crate::geo::LatLng;

/// Geometry part of an upstream feature. Coordinates are `[lon, lat]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub coordinates: Option<Vec<Value>>,
}

/// A single point of interest as returned by the upstream API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoiFeature {
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

impl PoiFeature {
    pub fn property(&self, key: &str) -> Option<String> {
        self.properties
            .get(key)
            .and_then(value_to_text)
            .filter(|s| !s.is_empty())
    }

    /// Position from the `[lon, lat]` pair, if both parse
    pub fn position(&self) -> Option<LatLng> {
        let coords = self.geometry.as_ref()?.coordinates.as_ref()?;
        let lon = coerce_number(coords.first()?)?;
        let lat = coerce_number(coords.get(1)?)?;
        Some(LatLng::new(lat, lon))
    }

    pub fn resource_id(&self) -> Option<String> {
        ["resource_id", "id", "ID"]
            .iter()
            .find_map(|key| self.property(key))
    }

    pub fn name(&self) -> Option<String> {
        self.property("name")
    }

    pub fn address(&self) -> Option<String> {
        self.property("address")
    }

    pub fn remarks(&self) -> Option<String> {
        self.property("remarks")
    }

    pub fn telephone_number(&self) -> Option<String> {
        self.property("telephoneNumber")
    }

    pub fn opening_hours_remarks(&self) -> Option<String> {
        self.property("openingHoursRemarks")
    }

    /// Display name, with the fallback for unnamed points
    pub fn display_name(&self) -> String {
        self.name().unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }

    /// Add-to-favorites request for this feature. Unnamed points are saved
    /// under the fallback name, since an export entry must carry a name.
    pub fn to_candidate(&self, category: Category) -> FavoriteCandidate {
        let position = self.position();
        FavoriteCandidate {
            resource_id: self.resource_id(),
            original_resource_id: None,
            category: Some(category.as_str().to_string()),
            name: Some(self.display_name()),
            address: self.address(),
            telephone_number: self.telephone_number(),
            opening_hours_remarks: self.opening_hours_remarks(),
            note: self.remarks(),
            lat: position.map(|p| p.lat),
            lon: position.map(|p| p.lon),
        }
    }
}

/// `resultsets` envelope of an upstream response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Option<Vec<PoiFeature>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(value: Value) -> PoiFeature {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_position_swaps_order() {
        let f = feature(json!({
            "properties": {"name": "AED 1"},
            "geometry": {"coordinates": [130.351903, 33.5902]}
        }));
        let pos = f.position().unwrap();
        assert_eq!(pos.lat, 33.5902);
        assert_eq!(pos.lon, 130.351903);
    }

    #[test]
    fn test_missing_geometry() {
        let f = feature(json!({"properties": {"name": "Nowhere"}}));
        assert!(f.position().is_none());

        let f = feature(json!({"properties": {}, "geometry": {"coordinates": [130.0]}}));
        assert!(f.position().is_none());
    }

    #[test]
    fn test_resource_id_fallbacks() {
        let f = feature(json!({"properties": {"ID": 77}}));
        assert_eq!(f.resource_id().as_deref(), Some("77"));

        let f = feature(json!({"properties": {"resource_id": "r-1", "id": "x"}}));
        assert_eq!(f.resource_id().as_deref(), Some("r-1"));
    }

    #[test]
    fn test_to_candidate() {
        let f = feature(json!({
            "properties": {"resource_id": "123", "name": "Test AED", "address": "Fukuoka"},
            "geometry": {"coordinates": [130.351903, 33.5902]}
        }));
        let candidate = f.to_candidate(Category::Aed);
        assert_eq!(candidate.key(), "aed::123::33.59020000::130.35190300");
        assert_eq!(candidate.address.as_deref(), Some("Fukuoka"));
        assert_eq!(candidate.name.as_deref(), Some("Test AED"));
    }

    #[test]
    fn test_unnamed_candidate_gets_fallback_name() {
        let f = feature(json!({
            "properties": {"resource_id": "5", "name": ""},
            "geometry": {"coordinates": [130.0, 33.0]}
        }));
        assert_eq!(f.display_name(), UNKNOWN_NAME);
        assert_eq!(f.to_candidate(Category::Toilet).name.as_deref(), Some(UNKNOWN_NAME));
    }
}
