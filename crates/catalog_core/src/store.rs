//! Async handle over the shared catalog connection.
//!
//! # Responsibility
//! - Own the single connection used by every item operation.
//! - Run each blocking repository call on tokio's blocking pool so async
//!   callers can issue operations concurrently.
//!
//! # Invariants
//! - The connection is bootstrapped before the handle is constructed.
//! - Access to the connection is serialized by one mutex; the store itself
//!   decides per-row atomicity, concurrent updates are last-write-wins.
//! - Repository errors pass through unchanged inside `StoreError::Repo`.

use crate::db::{open_db, open_db_in_memory};
use crate::model::item::{Item, ItemId, ItemUpdate, NewItem};
use crate::repo::item_repo::{ItemQuery, RepoError, RepoResult, SqliteItemRepository};
use crate::service::item_service::ItemService;
use log::{debug, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Repo(RepoError),
    /// The blocking task panicked or was cancelled before finishing.
    Worker(String),
    /// A previous operation panicked while holding the connection.
    Poisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Worker(message) => write!(f, "item store worker failed: {message}"),
            Self::Poisoned => write!(f, "item store connection is poisoned"),
        }
    }
}

impl StoreError {
    /// Stable, content-free identifier for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Repo(err) => err.code(),
            Self::Worker(_) => "worker_failed",
            Self::Poisoned => "connection_poisoned",
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Worker(_) | Self::Poisoned => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Cloneable handle; clones share the same connection.
#[derive(Clone)]
pub struct ItemStore {
    conn: Arc<Mutex<Connection>>,
}

impl ItemStore {
    /// Takes ownership of an already bootstrapped connection.
    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        SqliteItemRepository::try_new(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = open_db(path).map_err(RepoError::from)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory().map_err(RepoError::from)?;
        Self::from_connection(conn)
    }

    pub async fn get_item(&self, id: &str) -> StoreResult<Option<Item>> {
        let id = id.to_string();
        self.run("get_item", move |service| service.get_item(&id))
            .await
    }

    pub async fn get_items_by_category(&self, category: &str) -> StoreResult<Vec<Item>> {
        let category = category.to_string();
        self.run("get_items_by_category", move |service| {
            service.get_items_by_category(&category)
        })
        .await
    }

    pub async fn get_items_by_artist(&self, artist: &str) -> StoreResult<Vec<Item>> {
        let artist = artist.to_string();
        self.run("get_items_by_artist", move |service| {
            service.get_items_by_artist(&artist)
        })
        .await
    }

    pub async fn get_items(&self, ids: Vec<ItemId>) -> StoreResult<Vec<Item>> {
        self.run("get_items", move |service| service.get_items(&ids))
            .await
    }

    pub async fn get_items_not_in_array(&self, ids: Vec<ItemId>) -> StoreResult<Vec<Item>> {
        self.run("get_items_not_in_array", move |service| {
            service.get_items_not_in_array(&ids)
        })
        .await
    }

    pub async fn get_items_not_owned_by_category(
        &self,
        ids: Vec<ItemId>,
        category: &str,
    ) -> StoreResult<Vec<Item>> {
        let category = category.to_string();
        self.run("get_items_not_owned_by_category", move |service| {
            service.get_items_not_owned_by_category(&ids, &category)
        })
        .await
    }

    pub async fn find_items(&self, query: ItemQuery) -> StoreResult<Vec<Item>> {
        self.run("find_items", move |service| service.find_items(&query))
            .await
    }

    pub async fn add_item(&self, new_item: NewItem) -> StoreResult<Item> {
        self.run("add_item", move |service| service.add_item(new_item))
            .await
    }

    pub async fn update_item(&self, id: &str, update: ItemUpdate) -> StoreResult<Option<Item>> {
        let id = id.to_string();
        self.run("update_item", move |service| {
            service.update_item(&id, &update)
        })
        .await
    }

    pub async fn delete_item(&self, id: &str) -> StoreResult<Option<Item>> {
        let id = id.to_string();
        self.run("delete_item", move |service| service.delete_item(&id))
            .await
    }

    pub async fn does_item_exist(&self, id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        self.run("does_item_exist", move |service| {
            service.does_item_exist(&id)
        })
        .await
    }

    pub async fn ensure_item_exists(&self, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        self.run("ensure_item_exists", move |service| {
            service.ensure_item_exists(&id)
        })
        .await
    }

    async fn run<T, F>(&self, op: &'static str, call: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: for<'c> FnOnce(&ItemService<SqliteItemRepository<'c>>) -> RepoResult<T>
            + Send
            + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let started_at = Instant::now();

        let joined = tokio::task::spawn_blocking(move || -> StoreResult<T> {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            let service = ItemService::new(SqliteItemRepository::from_ready(&guard));
            Ok(call(&service)?)
        })
        .await;

        let result = joined.unwrap_or_else(|err| Err(StoreError::Worker(err.to_string())));
        match &result {
            Ok(_) => debug!(
                "event=store_call module=store status=ok op={op} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=store_call module=store status=error op={op} duration_ms={} error_code={}",
                started_at.elapsed().as_millis(),
                err.code()
            ),
        }
        result
    }
}
