use std::collections::HashMap;

use mvx_core_types::ItemId;

use crate::errors::{MvxError, Result};
use crate::model::ItemHandle;

/// Two-way registry of item identifiers for one tree
///
/// Lookups are O(1) on average in both directions. Not thread-safe;
/// designed for single-threaded use like the rest of the model.
#[derive(Debug, Clone, Default)]
pub struct IdentifierPool {
    by_key: HashMap<ItemId, ItemHandle>,
    by_item: HashMap<ItemHandle, ItemId>,
}

impl IdentifierPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn seeded(item: ItemHandle, key: ItemId) -> Self {
        let mut pool = Self::new();
        pool.by_key.insert(key.clone(), item);
        pool.by_item.insert(item, key);
        pool
    }

    /// Register an item, generating a fresh key when none is given
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKey` if the key is taken, or `ItemAlreadyRegistered`
    /// if the item already has a key.
    pub fn register_item(&mut self, item: ItemHandle, key: Option<ItemId>) -> Result<ItemId> {
        if let Some(existing) = self.by_item.get(&item) {
            return Err(MvxError::ItemAlreadyRegistered {
                item: item.to_string(),
                identifier: existing.to_string(),
            });
        }
        let key = key.unwrap_or_default();
        if self.by_key.contains_key(&key) {
            return Err(MvxError::DuplicateKey {
                identifier: key.to_string(),
            });
        }
        self.by_key.insert(key.clone(), item);
        self.by_item.insert(item, key.clone());
        Ok(key)
    }

    /// Remove an item's entry, returning its key
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if the item was never registered.
    pub fn unregister_item(&mut self, item: ItemHandle) -> Result<ItemId> {
        let key = self
            .by_item
            .remove(&item)
            .ok_or_else(|| MvxError::ItemNotFound {
                item: item.to_string(),
            })?;
        self.by_key.remove(&key);
        Ok(key)
    }

    pub fn find_by_key(&self, key: &ItemId) -> Option<ItemHandle> {
        self.by_key.get(key).copied()
    }

    pub fn find_key_for_item(&self, item: ItemHandle) -> Option<&ItemId> {
        self.by_item.get(&item)
    }

    pub fn contains_key(&self, key: &ItemId) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.by_key.clear();
        self.by_item.clear();
    }
}
