//! Store lookup by id

use super::StoreHandle;
use crate::key::StoreId;

/// The backing stores available to a page, looked up by [`StoreId`].
///
/// Passed explicitly into overlays; there is no process-wide store.
#[derive(Clone, Default)]
pub struct StoreRegistry {
    stores: Vec<StoreHandle>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store, replacing any store with the same id.
    pub fn register(&mut self, store: StoreHandle) {
        self.stores.retain(|existing| existing.id() != store.id());
        self.stores.push(store);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, store: StoreHandle) -> Self {
        self.register(store);
        self
    }

    pub fn get(&self, id: &StoreId) -> Option<&StoreHandle> {
        self.stores.iter().find(|store| store.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoreHandle> {
        self.stores.iter()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stores.iter().map(|store| store.id().as_str()))
            .finish()
    }
}
