mod database;
mod favorite_repository;
mod migration;
mod slot_store;

pub use database::{Connection, Database, SCHEMA_VERSION};
pub use favorite_repository::{FavoriteRepository, FavoritesConfig, DEFAULT_FAVORITES_SLOT, MAX_FAVORITES};
pub use migration::{migrate, Migration};
pub use slot_store::{MemorySlotStore, SlotStore, SqliteSlotStore};
