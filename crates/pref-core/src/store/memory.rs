//! In-memory backing store

use std::cell::RefCell;

use pref_fs::PreferenceMap;

use super::{ListenerList, PreferenceStore, StoreListener, SubscriptionId};
use crate::Result;
use crate::key::StoreId;

/// A backing store held entirely in memory. Flushing always succeeds.
pub struct MemoryStore {
    id: StoreId,
    values: RefCell<PreferenceMap>,
    defaults: RefCell<PreferenceMap>,
    listeners: ListenerList,
}

impl MemoryStore {
    pub fn new(id: impl Into<StoreId>) -> Self {
        Self::with_values(id, PreferenceMap::new())
    }

    /// Create a store pre-populated with explicit values.
    pub fn with_values(id: impl Into<StoreId>, values: PreferenceMap) -> Self {
        Self {
            id: id.into(),
            values: RefCell::new(values),
            defaults: RefCell::new(PreferenceMap::new()),
            listeners: ListenerList::default(),
        }
    }

    /// Explicit values, ordered by name.
    pub fn snapshot(&self) -> PreferenceMap {
        self.values.borrow().clone()
    }

    /// Number of registered change callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Set an explicit value; returns whether the stored text changed.
    pub(crate) fn put(&self, name: &str, value: &str) -> bool {
        let before = self.value(name);
        let previous = self
            .values
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        self.notify_if_changed(name, &before);
        previous.as_deref() != Some(value)
    }

    /// Remove an explicit value; returns whether one existed.
    pub(crate) fn take(&self, name: &str) -> bool {
        let before = self.value(name);
        let removed = self.values.borrow_mut().remove(name).is_some();
        self.notify_if_changed(name, &before);
        removed
    }

    fn notify_if_changed(&self, name: &str, before: &str) {
        let after = self.value(name);
        if after != before {
            self.listeners.notify(name, &after);
        }
    }
}

impl PreferenceStore for MemoryStore {
    fn id(&self) -> &StoreId {
        &self.id
    }

    fn read(&self, name: &str) -> Option<String> {
        self.values.borrow().get(name).cloned()
    }

    fn read_default(&self, name: &str) -> Option<String> {
        self.defaults.borrow().get(name).cloned()
    }

    fn set_default(&self, name: &str, value: &str) {
        let before = self.value(name);
        self.defaults
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        self.notify_if_changed(name, &before);
    }

    fn write(&self, name: &str, value: &str) {
        self.put(name, value);
    }

    fn remove(&self, name: &str) {
        self.take(name);
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn subscribe(&self, listener: StoreListener) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.remove(id);
    }
}
