//! Item use-case service.
//!
//! # Responsibility
//! - Provide the stable catalog entry points (get/list/add/update/delete).
//! - Delegate persistence to a repository implementation.
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - Repository errors are returned unchanged.

use crate::model::item::{Item, ItemId, ItemUpdate, NewItem};
use crate::repo::item_repo::{ItemQuery, ItemRepository, RepoError, RepoResult};

/// Use-case wrapper for catalog item operations.
pub struct ItemService<R: ItemRepository> {
    repo: R,
}

impl<R: ItemRepository> ItemService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_item(&self, id: &str) -> RepoResult<Option<Item>> {
        self.repo.get_item(id)
    }

    pub fn get_items_by_category(&self, category: &str) -> RepoResult<Vec<Item>> {
        self.repo.get_items_by_category(category)
    }

    pub fn get_items_by_artist(&self, artist: &str) -> RepoResult<Vec<Item>> {
        self.repo.get_items_by_artist(artist)
    }

    /// Items whose id is in `ids`.
    pub fn get_items(&self, ids: &[ItemId]) -> RepoResult<Vec<Item>> {
        self.repo.get_items(ids)
    }

    /// Items whose id is not in `ids`.
    pub fn get_items_not_in_array(&self, ids: &[ItemId]) -> RepoResult<Vec<Item>> {
        self.repo.get_items_not_in_array(ids)
    }

    pub fn get_items_not_owned_by_category(
        &self,
        ids: &[ItemId],
        category: &str,
    ) -> RepoResult<Vec<Item>> {
        self.repo.get_items_not_owned_by_category(ids, category)
    }

    /// Runs an arbitrary filter; the named reads above are fixed shapes of it.
    pub fn find_items(&self, query: &ItemQuery) -> RepoResult<Vec<Item>> {
        self.repo.find_items(query)
    }

    /// Adds an item under `"{artist}-{item_name}"` with a single-vote rating.
    ///
    /// # Contract
    /// - `rating.value == rating.actual_value == new_item.rating`.
    /// - `rating.number_of_votes == 1`.
    /// - Returns `RepoError::DuplicateId` if the id is already stored.
    pub fn add_item(&self, new_item: NewItem) -> RepoResult<Item> {
        self.repo.add_item(new_item)
    }

    pub fn update_item(&self, id: &str, update: &ItemUpdate) -> RepoResult<Option<Item>> {
        self.repo.update_item(id, update)
    }

    pub fn delete_item(&self, id: &str) -> RepoResult<Option<Item>> {
        self.repo.delete_item(id)
    }

    /// `Ok(false)` when the id is unknown; only store failures are errors.
    pub fn does_item_exist(&self, id: &str) -> RepoResult<bool> {
        self.repo.does_item_exist(id)
    }

    /// Like [`Self::does_item_exist`], but reports an unknown id as
    /// `RepoError::NotFound` for callers that treat absence as a failure.
    pub fn ensure_item_exists(&self, id: &str) -> RepoResult<()> {
        if self.repo.does_item_exist(id)? {
            return Ok(());
        }
        Err(RepoError::NotFound(id.to_string()))
    }
}
