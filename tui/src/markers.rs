//! Markers built from fetched features or stored favorites.

use poimap_core::geo::LatLng;
use poimap_core::models::{Category, FavoriteCandidate, FavoriteLookup, FavoriteRecord, PoiFeature};
use poimap_core::storage::{FavoriteRepository, SlotStore};
use tracing::{debug, warn};

/// Colour for markers whose category is not known
pub const DEFAULT_MARKER_RGB: (u8, u8, u8) = (0x34, 0x98, 0xdb);

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Map position. Stored favorites may have none; they are listed but
    /// not drawn.
    pub position: Option<LatLng>,
    pub title: String,
    pub popup_lines: Vec<String>,
    pub rgb: (u8, u8, u8),
    /// Request used when this marker is added to favorites
    pub candidate: FavoriteCandidate,
    pub is_favorite: bool,
}

impl Marker {
    pub fn lookup(&self) -> FavoriteLookup {
        self.candidate.lookup()
    }

    /// One-line entry for marker lists
    pub fn label(&self) -> String {
        let star = if self.is_favorite { "★" } else { " " };
        format!("{} {}", star, self.title)
    }
}

fn popup_lines(
    address: Option<&str>,
    remarks: Option<&str>,
    telephone: Option<&str>,
    opening_hours: Option<&str>,
) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(address) = address {
        lines.push(format!("📍 {}", address));
    }
    if let Some(remarks) = remarks {
        lines.push(remarks.to_string());
    }
    if let Some(telephone) = telephone {
        lines.push(format!("☎ {}", telephone));
    }
    if let Some(hours) = opening_hours {
        lines.push(format!("🕒 {}", hours));
    }
    lines
}

/// Markers for one category's features. Features without a usable
/// position are skipped. Favorite flags are checked against `favorites`,
/// loaded once by the caller.
pub fn build_markers<S: SlotStore>(
    features: &[PoiFeature],
    category: Category,
    repository: &FavoriteRepository<S>,
    favorites: &[FavoriteRecord],
) -> Vec<Marker> {
    let mut markers = Vec::with_capacity(features.len());

    for feature in features {
        let Some(position) = feature.position() else {
            warn!(properties = ?feature.properties, "feature has no position");
            continue;
        };

        let candidate = feature.to_candidate(category);
        let is_favorite = repository.is_favorite(&candidate.lookup(), Some(favorites));
        let address = feature.address();
        let remarks = feature.remarks();
        let telephone = feature.telephone_number();
        let hours = feature.opening_hours_remarks();

        markers.push(Marker {
            position: Some(position),
            title: feature.display_name(),
            popup_lines: popup_lines(
                address.as_deref(),
                remarks.as_deref(),
                telephone.as_deref(),
                hours.as_deref(),
            ),
            rgb: category.marker_rgb(),
            candidate,
            is_favorite,
        });
    }

    debug!(count = markers.len(), category = %category, "markers built");
    markers
}

/// Markers for the favorites view, one per stored favorite. Favorites
/// without coordinates stay in the list so they can still be removed.
pub fn favorite_markers(records: &[FavoriteRecord]) -> Vec<Marker> {
    records
        .iter()
        .map(|record| {
            let position = record.position();
            if position.is_none() {
                debug!(key = %record.resource_id, "favorite has no position");
            }

            let candidate = FavoriteCandidate {
                resource_id: record.original_id().map(str::to_string),
                original_resource_id: None,
                category: record.category.clone(),
                name: Some(record.display_name().to_string()),
                address: record.address.clone(),
                telephone_number: record.telephone_number.clone(),
                opening_hours_remarks: record.opening_hours_remarks.clone(),
                note: record.note.clone(),
                lat: record.lat,
                lon: record.lon,
            };

            let mut lines = popup_lines(
                record.address.as_deref(),
                record.note.as_deref(),
                record.telephone_number.as_deref(),
                record.opening_hours_remarks.as_deref(),
            );
            if position.is_none() {
                lines.push("No location recorded".to_string());
            }
            if let Some(added) = record.added_at {
                lines.push(format!("Added {}", added.format("%Y-%m-%d %H:%M")));
            }

            Marker {
                position,
                title: record.display_name().to_string(),
                popup_lines: lines,
                rgb: record
                    .known_category()
                    .map(|c| c.marker_rgb())
                    .unwrap_or(DEFAULT_MARKER_RGB),
                candidate,
                is_favorite: true,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use poimap_core::storage::MemorySlotStore;
    use serde_json::json;

    fn features() -> Vec<PoiFeature> {
        serde_json::from_value(json!([
            {"properties": {"resource_id": "1", "name": "Station AED", "address": "1-1 Hakata",
                            "remarks": "Inside the gate", "telephoneNumber": "092-000-0000"},
             "geometry": {"coordinates": [130.351903, 33.5902]}},
            {"properties": {"resource_id": "2"}, "geometry": {"coordinates": [130.36, 33.6]}},
            {"properties": {"resource_id": "3", "name": "Nowhere"}}
        ]))
        .unwrap()
    }

    #[test]
    fn test_build_markers() {
        let repo = FavoriteRepository::new(MemorySlotStore::new());
        let markers = build_markers(&features(), Category::Aed, &repo, &[]);

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].title, "Station AED");
        assert_eq!(
            markers[0].popup_lines,
            vec!["📍 1-1 Hakata", "Inside the gate", "☎ 092-000-0000"]
        );
        assert_eq!(markers[0].rgb, (0xe7, 0x4c, 0x3c));
        assert_eq!(markers[1].title, "Unknown name");
        assert!(markers[1].popup_lines.is_empty());
        assert!(markers.iter().all(|m| !m.is_favorite));
    }

    #[test]
    fn test_favorite_flag_uses_preloaded_collection() {
        let repo = FavoriteRepository::new(MemorySlotStore::new());
        let features = features();
        repo.add(&features[0].to_candidate(Category::Aed)).unwrap();

        let favorites = repo.load_all();
        let markers = build_markers(&features, Category::Aed, &repo, &favorites);
        assert!(markers[0].is_favorite);
        assert!(!markers[1].is_favorite);

        // Same id in another category is a different favorite
        let markers = build_markers(&features, Category::Hospital, &repo, &favorites);
        assert!(!markers[0].is_favorite);
    }

    #[test]
    fn test_favorite_markers_round_trip_lookup() {
        let repo = FavoriteRepository::new(MemorySlotStore::new());
        let candidate = FavoriteCandidate::new("h1", Category::Hospital, 33.1, 130.2).with_name("Clinic");
        repo.add(&candidate).unwrap();

        let no_id = FavoriteCandidate {
            category: Some("toilet".to_string()),
            lat: Some(33.0),
            lon: Some(130.0),
            ..Default::default()
        };
        repo.add(&no_id).unwrap();

        let records = repo.load_all();
        let markers = favorite_markers(&records);
        assert_eq!(markers.len(), 2);
        assert!(markers.iter().all(|m| m.is_favorite));
        assert_eq!(markers[0].rgb, (0x34, 0x98, 0xdb));
        assert_eq!(markers[1].title, "Unknown name");

        for marker in &markers {
            assert!(repo.is_favorite(&marker.lookup(), Some(&records)));
        }
        repo.remove(&markers[1].lookup()).unwrap();
        assert_eq!(repo.count(), 1);
    }

    #[test]
    fn test_favorite_without_coordinates_is_listed_and_removable() {
        let repo = FavoriteRepository::new(MemorySlotStore::new());
        let data = json!([
            {"resource_id": "x", "category": "aed", "name": "Lost AED", "lat": "abc", "lon": "abc"}
        ]);
        repo.import_json(&data.to_string()).unwrap();

        let records = repo.load_all();
        assert_eq!(records[0].resource_id, "aed::x::na::na");

        let markers = favorite_markers(&records);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].position, None);
        assert_eq!(markers[0].title, "Lost AED");
        assert!(markers[0].popup_lines.contains(&"No location recorded".to_string()));

        repo.remove(&markers[0].lookup()).unwrap();
        assert_eq!(repo.count(), 0);
    }

    #[test]
    fn test_label() {
        let repo = FavoriteRepository::new(MemorySlotStore::new());
        let mut markers = build_markers(&features(), Category::Toilet, &repo, &[]);
        assert_eq!(markers[0].label(), "  Station AED");
        markers[0].is_favorite = true;
        assert_eq!(markers[0].label(), "★ Station AED");
    }
}
