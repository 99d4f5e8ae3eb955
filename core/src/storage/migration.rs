//! Structural migration of stored favorites.
//!
//! Persisted collections carry no schema version, so every load normalizes
//! each record in place: coordinates are coerced to numbers, the original id
//! is recorded, and `resource_id` is recomputed as the canonical key.
//!
//! A record without `original_resource_id` takes its original id from
//! `resource_id` verbatim. The one exception is a key derived without any
//! id, which keeps `noid` so that such a record settles after one pass.

use serde_json::{Map, Value};

use crate::models::{coerce_number, favorite_key, id_from_resource_id, value_to_text, FavoriteRecord};

/// Result of migrating a stored collection
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub records: Vec<FavoriteRecord>,
    /// Set when any record was dropped or rewritten
    pub changed: bool,
}

pub fn migrate(stored: Vec<Value>) -> Migration {
    let mut changed = false;
    let mut records = Vec::with_capacity(stored.len());

    for item in stored {
        match item {
            Value::Object(fields) => {
                let (record, rewritten) = migrate_record(fields);
                changed |= rewritten;
                records.push(record);
            }
            _ => changed = true,
        }
    }

    Migration { records, changed }
}

/// Normalize one stored object. Returns the record and whether its
/// identity fields had to be rewritten.
fn migrate_record(fields: Map<String, Value>) -> (FavoriteRecord, bool) {
    let lat = fields.get("lat").and_then(coerce_number);
    let lon = fields.get("lon").and_then(coerce_number);

    let stored_id = fields.get("resource_id").and_then(value_to_text);
    let stored_original = fields.get("original_resource_id").and_then(value_to_text);
    let original = stored_original
        .clone()
        .or_else(|| stored_id.as_deref().and_then(id_from_resource_id).map(str::to_string));
    let category = fields.get("category").and_then(value_to_text);

    let key = favorite_key(original.as_deref(), category.as_deref(), lat, lon);

    let rewritten = stored_id.as_deref() != Some(key.as_str())
        || !coordinate_settled(fields.get("lat"), lat)
        || !coordinate_settled(fields.get("lon"), lon)
        || stored_original != original;

    let mut record = FavoriteRecord::from_fields(fields);
    record.resource_id = key;
    record.original_resource_id = original;
    record.lat = lat;
    record.lon = lon;

    (record, rewritten)
}

/// Stored coordinate already equals its coerced form
fn coordinate_settled(stored: Option<&Value>, coerced: Option<f64>) -> bool {
    match (stored, coerced) {
        (Some(Value::Number(n)), Some(v)) => n.as_f64() == Some(v),
        (Some(Value::Null), None) => true,
        _ => false,
    }
}
