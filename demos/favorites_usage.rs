//! Walk through the favorites store against an in-memory slot.
//!
//! Run with `cargo run -p poimap-core --example favorites_usage`.

use poimap_core::geo::{LatLng, RefetchGate};
use poimap_core::models::{Category, FavoriteCandidate, FavoriteLookup};
use poimap_core::storage::{FavoriteRepository, MemorySlotStore, SlotStore, DEFAULT_FAVORITES_SLOT};

fn main() -> anyhow::Result<()> {
    let favorites = FavoriteRepository::new(MemorySlotStore::new());

    let aed = FavoriteCandidate::new("123", Category::Aed, 33.5902, 130.351903).with_name("Station AED");
    let record = favorites.add(&aed)?;
    println!("Added {} as {}", record.display_name(), record.resource_id);

    // Adding the same point again is rejected
    if let Err(err) = favorites.add(&aed) {
        println!("Second add rejected: {}", err);
    }

    // A collection saved before keys existed is migrated on the next read
    favorites.store().set(
        DEFAULT_FAVORITES_SLOT,
        r#"[{"resource_id":"hospital_42","category":"hospital","name":"Clinic","lat":33.1,"lon":130.2}]"#,
    )?;
    for record in favorites.get_all() {
        println!("Migrated: {}", record.resource_id);
    }

    let clinic = FavoriteLookup::new("hospital_42")
        .category("hospital")
        .at(Some(33.1), Some(130.2));
    println!("Clinic is a favorite: {}", favorites.is_favorite(&clinic, None));

    let exported = favorites.export_json()?;
    favorites.remove(&clinic)?;
    println!("After remove: {} favorites", favorites.count());

    let restored = favorites.import_json(&exported)?;
    println!("Imported {} favorites back", restored);

    // Panning less than the threshold does not reload
    let mut gate = RefetchGate::default();
    let start = LatLng::new(33.5902, 130.351903);
    gate.mark_loaded(start);
    for offset in [0.001, 0.005, 0.01] {
        let center = LatLng::new(start.lat, start.lon + offset);
        println!(
            "{:.0} m away, reload: {}",
            start.distance_to(&center),
            gate.should_refetch(center)
        );
    }

    Ok(())
}
