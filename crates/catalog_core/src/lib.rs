//! Data access for catalog items (album records).
//!
//! The crate exposes one repository over an `items` collection: reads by
//! id, category, artist and id set, plus add, partial update and delete.
//! [`ItemStore`] wraps the shared connection for async callers.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{CatalogConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::item::{
    derive_item_id, Item, ItemId, ItemUpdate, ItemValidationError, NewItem, Rating, Track,
};
pub use repo::item_repo::{
    IdSelection, ItemQuery, ItemRepository, RepoError, RepoResult, SqliteItemRepository,
};
pub use service::item_service::ItemService;
pub use store::{ItemStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
