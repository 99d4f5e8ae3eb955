use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::favorite_key::{favorite_key, id_from_resource_id, value_to_text, KEY_SEPARATOR};
use super::{parse_timestamp, Category};
use crate::geo::LatLng;

/// Shown, and stored, for points the data source gave no name
pub const UNKNOWN_NAME: &str = "Unknown name";

/// A saved point of interest.
///
/// Field names follow the persisted/exported JSON format. Fields this
/// version does not know about are kept in `extra` and written back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FavoriteRecord {
    pub resource_id: String,
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "telephoneNumber", default, skip_serializing_if = "Option::is_none")]
    pub telephone_number: Option<String>,
    #[serde(rename = "openingHoursRemarks", default, skip_serializing_if = "Option::is_none")]
    pub opening_hours_remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "addedAt", default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub original_resource_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FavoriteRecord {
    /// Build a new record from an add request
    pub fn from_candidate(candidate: &FavoriteCandidate, added_at: DateTime<Utc>) -> Self {
        Self {
            resource_id: candidate.key(),
            category: candidate.category.clone(),
            name: candidate.name.clone(),
            lat: candidate.lat.filter(|v| v.is_finite()),
            lon: candidate.lon.filter(|v| v.is_finite()),
            address: candidate.address.clone(),
            telephone_number: candidate.telephone_number.clone(),
            opening_hours_remarks: candidate.opening_hours_remarks.clone(),
            note: candidate.note.clone(),
            added_at: Some(added_at),
            original_resource_id: candidate.base_id().map(str::to_string),
            extra: Map::new(),
        }
    }

    /// Lenient conversion from a stored JSON object. Identity fields are
    /// copied as found; callers are expected to normalize them.
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        let mut take_text = |key: &str| fields.remove(key).as_ref().and_then(value_to_text);

        let resource_id = take_text("resource_id").unwrap_or_default();
        let original_resource_id = take_text("original_resource_id");
        let category = take_text("category");
        let name = take_text("name");
        let address = take_text("address");
        let telephone_number = take_text("telephoneNumber");
        let opening_hours_remarks = take_text("openingHoursRemarks");
        let note = take_text("note");

        let lat = fields.remove("lat").as_ref().and_then(super::coerce_number);
        let lon = fields.remove("lon").as_ref().and_then(super::coerce_number);

        let added_at = match fields.remove("addedAt") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => match parse_timestamp(&text) {
                Some(ts) => Some(ts),
                None => {
                    fields.insert("addedAt".to_string(), Value::String(text));
                    None
                }
            },
            Some(other) => {
                fields.insert("addedAt".to_string(), other);
                None
            }
        };

        Self {
            resource_id,
            category,
            name,
            lat,
            lon,
            address,
            telephone_number,
            opening_hours_remarks,
            note,
            added_at,
            original_resource_id,
            extra: fields,
        }
    }

    /// The identifier the data source supplied, falling back to the one
    /// carried by `resource_id`
    pub fn original_id(&self) -> Option<&str> {
        self.original_resource_id
            .as_deref()
            .or_else(|| id_from_resource_id(&self.resource_id))
    }

    /// Key recomputed from this record's own fields
    pub fn derived_key(&self) -> String {
        favorite_key(self.original_id(), self.category.as_deref(), self.lat, self.lon)
    }

    /// Saved before identity keys existed: no original id and a plain resource id
    pub fn is_legacy(&self) -> bool {
        self.original_resource_id.as_deref().map_or(true, str::is_empty)
            && !self.resource_id.contains(KEY_SEPARATOR)
    }

    /// Canonical-key match, with plain id equality for legacy records
    pub fn matches(&self, lookup: &FavoriteLookup) -> bool {
        if self.derived_key() == lookup.key() {
            return true;
        }
        self.is_legacy() && self.resource_id == lookup.identifier
    }

    /// Lookup that targets this record
    pub fn lookup(&self) -> FavoriteLookup {
        FavoriteLookup {
            identifier: self.original_id().unwrap_or_default().to_string(),
            category: self.category.clone(),
            lat: self.lat,
            lon: self.lon,
            original_resource_id: None,
        }
    }

    pub fn position(&self) -> Option<LatLng> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(LatLng::new(lat, lon)),
            _ => None,
        }
    }

    pub fn known_category(&self) -> Option<Category> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(UNKNOWN_NAME)
    }
}

/// Fields supplied by the UI when adding a favorite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCandidate {
    pub resource_id: Option<String>,
    pub original_resource_id: Option<String>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub telephone_number: Option<String>,
    pub opening_hours_remarks: Option<String>,
    pub note: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl FavoriteCandidate {
    pub fn new(resource_id: impl Into<String>, category: Category, lat: f64, lon: f64) -> Self {
        Self {
            resource_id: Some(resource_id.into()),
            category: Some(category.as_str().to_string()),
            lat: Some(lat),
            lon: Some(lon),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// `original_resource_id` if given, else `resource_id`
    pub fn base_id(&self) -> Option<&str> {
        self.original_resource_id
            .as_deref()
            .or(self.resource_id.as_deref())
    }

    pub fn key(&self) -> String {
        favorite_key(self.base_id(), self.category.as_deref(), self.lat, self.lon)
    }

    pub fn lookup(&self) -> FavoriteLookup {
        FavoriteLookup {
            identifier: self.base_id().unwrap_or_default().to_string(),
            category: self.category.clone(),
            lat: self.lat,
            lon: self.lon,
            original_resource_id: None,
        }
    }
}

/// Identifies a favorite for removal or membership checks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoriteLookup {
    pub identifier: String,
    pub category: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub original_resource_id: Option<String>,
}

impl FavoriteLookup {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn at(mut self, lat: Option<f64>, lon: Option<f64>) -> Self {
        self.lat = lat;
        self.lon = lon;
        self
    }

    pub fn original_resource_id(mut self, id: impl Into<String>) -> Self {
        self.original_resource_id = Some(id.into());
        self
    }

    /// Target key: the original id when supplied, else the identifier
    pub fn key(&self) -> String {
        let id = self
            .original_resource_id
            .as_deref()
            .unwrap_or(&self.identifier);
        favorite_key(Some(id), self.category.as_deref(), self.lat, self.lon)
    }
}
