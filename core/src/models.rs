mod category;
mod favorite;
mod favorite_key;
mod feature;

pub use category::Category;
pub use favorite::{FavoriteCandidate, FavoriteLookup, FavoriteRecord, UNKNOWN_NAME};
pub use favorite_key::{
    coerce_number, favorite_key, id_from_resource_id, normalize_category, normalize_coordinate, normalize_identifier,
    parse_number, value_to_text, KEY_SEPARATOR,
};
pub use feature::{FeatureCollection, Geometry, PoiFeature};

use chrono::{DateTime, Utc};

/// Convert DateTime<Utc> to Unix timestamp (seconds)
pub fn datetime_to_timestamp(datetime: &DateTime<Utc>) -> i64 {
    datetime.timestamp()
}

/// Parse an RFC 3339 timestamp as written by `addedAt`
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
