use crate::models::{FavoriteCandidate, FavoriteLookup, FavoriteRecord};
use crate::{Error, Result};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use super::migration::{migrate, Migration};
use super::slot_store::SlotStore;

pub const DEFAULT_FAVORITES_SLOT: &str = "poimap_favorites";
pub const MAX_FAVORITES: usize = 100;

const REQUIRED_IMPORT_FIELDS: [&str; 5] = ["resource_id", "category", "name", "lat", "lon"];

#[derive(Debug, Clone, PartialEq)]
pub struct FavoritesConfig {
    /// Slot holding the JSON array of favorites
    pub slot: String,
    pub max_favorites: usize,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            slot: DEFAULT_FAVORITES_SLOT.to_string(),
            max_favorites: MAX_FAVORITES,
        }
    }
}

/// Owner of the persisted favorites collection.
///
/// Every operation is a synchronous read-modify-write of one slot. Reads
/// migrate the stored collection and re-save it when migration changed
/// anything. Read failures degrade to an empty collection.
pub struct FavoriteRepository<S: SlotStore> {
    store: S,
    config: FavoritesConfig,
}

impl<S: SlotStore> FavoriteRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, FavoritesConfig::default())
    }

    pub fn with_config(store: S, config: FavoritesConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &FavoritesConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load and migrate the stored collection; empty on any failure
    pub fn load_all(&self) -> Vec<FavoriteRecord> {
        match self.try_load() {
            Ok(records) => records,
            Err(err) => {
                warn!(slot = %self.config.slot, error = %err, "failed to load favorites");
                Vec::new()
            }
        }
    }

    fn try_load(&self) -> Result<Vec<FavoriteRecord>> {
        let stored = match self.store.get(&self.config.slot)? {
            Some(text) if !text.is_empty() => text,
            _ => return Ok(Vec::new()),
        };

        let items = match serde_json::from_str::<Value>(&stored)? {
            Value::Array(items) => items,
            _ => {
                warn!(slot = %self.config.slot, "stored favorites are not a list");
                return Ok(Vec::new());
            }
        };

        let Migration { records, changed } = migrate(items);
        if changed {
            debug!(count = records.len(), "favorites migrated, saving normalized collection");
            if let Err(err) = self.save(&records) {
                warn!(error = %err, "failed to save migrated favorites");
            }
        }
        Ok(records)
    }

    fn save(&self, records: &[FavoriteRecord]) -> Result<()> {
        let json = serde_json::to_string(records)?;
        self.store.set(&self.config.slot, &json).map_err(|err| {
            error!(slot = %self.config.slot, error = %err, "failed to save favorites");
            err
        })
    }

    /// Add a favorite. Rejects duplicates and a full collection without
    /// touching storage.
    pub fn add(&self, candidate: &FavoriteCandidate) -> Result<FavoriteRecord> {
        let mut records = self.load_all();
        let key = candidate.key();

        if self.is_favorite(&candidate.lookup(), Some(&records)) {
            warn!(key = %key, "already a favorite");
            return Err(Error::DuplicateFavorite(key));
        }

        if records.len() >= self.config.max_favorites {
            warn!(max = self.config.max_favorites, "favorites are full");
            return Err(Error::FavoritesFull(self.config.max_favorites));
        }

        let record = FavoriteRecord::from_candidate(candidate, Utc::now());
        records.push(record.clone());
        self.save(&records)?;

        info!(key = %record.resource_id, "favorite added");
        Ok(record)
    }

    /// Remove every record matching `lookup`
    pub fn remove(&self, lookup: &FavoriteLookup) -> Result<()> {
        let records = self.load_all();
        let before = records.len();

        let kept: Vec<FavoriteRecord> = records
            .into_iter()
            .filter(|record| !record.matches(lookup))
            .collect();

        if kept.len() == before {
            warn!(identifier = %lookup.identifier, "favorite not found");
            return Err(Error::NotFound(format!("Favorite not found: {}", lookup.identifier)));
        }

        self.save(&kept)?;
        info!(key = %lookup.key(), removed = before - kept.len(), "favorite removed");
        Ok(())
    }

    /// Check membership. Pass `cached` when checking many points against
    /// one already-loaded collection.
    pub fn is_favorite(&self, lookup: &FavoriteLookup, cached: Option<&[FavoriteRecord]>) -> bool {
        match cached {
            Some(records) => records.iter().any(|record| record.matches(lookup)),
            None => self.load_all().iter().any(|record| record.matches(lookup)),
        }
    }

    pub fn get_all(&self) -> Vec<FavoriteRecord> {
        self.load_all()
    }

    pub fn get_by_category(&self, category: &str) -> Vec<FavoriteRecord> {
        self.load_all()
            .into_iter()
            .filter(|record| record.category.as_deref() == Some(category))
            .collect()
    }

    /// Delete the stored collection
    pub fn clear_all(&self) -> Result<()> {
        self.store.remove(&self.config.slot).map_err(|err| {
            error!(slot = %self.config.slot, error = %err, "failed to clear favorites");
            err
        })?;
        info!("favorites cleared");
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.load_all().len()
    }

    /// Pretty-printed JSON array of the whole collection
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.load_all())?)
    }

    /// Replace the stored collection with the given JSON array. Nothing is
    /// written unless every entry validates.
    pub fn import_json(&self, text: &str) -> Result<usize> {
        let parsed: Value = serde_json::from_str(text).map_err(|err| {
            error!(error = %err, "import is not valid JSON");
            Error::from(err)
        })?;

        let items = match parsed {
            Value::Array(items) => items,
            _ => {
                error!("import is not a JSON array");
                return Err(Error::InvalidInput("Import data must be a JSON array".to_string()));
            }
        };

        self.validate_import(&items).map_err(|err| {
            error!(error = %err, "import rejected");
            err
        })?;

        let count = items.len();
        self.store
            .set(&self.config.slot, &serde_json::to_string(&items)?)?;

        info!(count, "favorites imported");
        Ok(count)
    }

    fn validate_import(&self, items: &[Value]) -> Result<()> {
        for (index, item) in items.iter().enumerate() {
            let fields = item
                .as_object()
                .ok_or_else(|| Error::InvalidInput(format!("Entry {} is not an object", index)))?;

            if let Some(missing) = REQUIRED_IMPORT_FIELDS
                .iter()
                .find(|field| !is_present(fields.get(**field)))
            {
                return Err(Error::InvalidInput(format!(
                    "Entry {} is missing required field `{}`",
                    index, missing
                )));
            }
        }

        if items.len() > self.config.max_favorites {
            return Err(Error::FavoritesFull(self.config.max_favorites));
        }

        let Migration { records, .. } = migrate(items.to_vec());
        let mut seen = HashSet::new();
        for record in &records {
            if !seen.insert(record.resource_id.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "Duplicate favorite in import: {}",
                    record.resource_id
                )));
            }
        }

        Ok(())
    }
}

/// Required import fields must be set: not null, `false`, or an empty string
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
