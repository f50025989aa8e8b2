//! Backing-store fakes.

use std::cell::Cell;

use pref_core::store::{StoreListener, SubscriptionId};
use pref_core::{Error, MemoryStore, PreferenceStore, Result, StoreId};

/// A [`MemoryStore`] that counts subscribe, unsubscribe and flush calls.
pub struct RecordingStore {
    memory: MemoryStore,
    subscribes: Cell<usize>,
    unsubscribes: Cell<usize>,
    flushes: Cell<usize>,
}

impl RecordingStore {
    pub fn new(id: impl Into<StoreId>) -> Self {
        Self {
            memory: MemoryStore::new(id),
            subscribes: Cell::new(0),
            unsubscribes: Cell::new(0),
            flushes: Cell::new(0),
        }
    }

    pub fn subscribes(&self) -> usize {
        self.subscribes.get()
    }

    pub fn unsubscribes(&self) -> usize {
        self.unsubscribes.get()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.get()
    }

    /// Listeners currently attached.
    pub fn active_subscriptions(&self) -> usize {
        self.memory.subscriber_count()
    }
}

impl PreferenceStore for RecordingStore {
    fn id(&self) -> &StoreId {
        self.memory.id()
    }

    fn read(&self, name: &str) -> Option<String> {
        self.memory.read(name)
    }

    fn read_default(&self, name: &str) -> Option<String> {
        self.memory.read_default(name)
    }

    fn set_default(&self, name: &str, value: &str) {
        self.memory.set_default(name, value);
    }

    fn write(&self, name: &str, value: &str) {
        self.memory.write(name, value);
    }

    fn remove(&self, name: &str) {
        self.memory.remove(name);
    }

    fn flush(&self) -> Result<()> {
        self.flushes.set(self.flushes.get() + 1);
        Ok(())
    }

    fn subscribe(&self, listener: StoreListener) -> SubscriptionId {
        self.subscribes.set(self.subscribes.get() + 1);
        self.memory.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.unsubscribes.set(self.unsubscribes.get() + 1);
        self.memory.unsubscribe(id);
    }
}

/// A [`MemoryStore`] whose flush fails while `failing` is set.
pub struct FailingStore {
    memory: MemoryStore,
    failing: Cell<bool>,
    attempts: Cell<usize>,
}

impl FailingStore {
    /// A store that fails every flush until [`set_failing(false)`](Self::set_failing).
    pub fn new(id: impl Into<StoreId>) -> Self {
        Self {
            memory: MemoryStore::new(id),
            failing: Cell::new(true),
            attempts: Cell::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Flush calls so far, failed or not.
    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }
}

impl PreferenceStore for FailingStore {
    fn id(&self) -> &StoreId {
        self.memory.id()
    }

    fn read(&self, name: &str) -> Option<String> {
        self.memory.read(name)
    }

    fn read_default(&self, name: &str) -> Option<String> {
        self.memory.read_default(name)
    }

    fn set_default(&self, name: &str, value: &str) {
        self.memory.set_default(name, value);
    }

    fn write(&self, name: &str, value: &str) {
        self.memory.write(name, value);
    }

    fn remove(&self, name: &str) {
        self.memory.remove(name);
    }

    fn flush(&self) -> Result<()> {
        self.attempts.set(self.attempts.get() + 1);
        if self.failing.get() {
            return Err(Error::Persistence {
                store: self.id().clone(),
                message: "disk full".to_string(),
            });
        }
        Ok(())
    }

    fn subscribe(&self, listener: StoreListener) -> SubscriptionId {
        self.memory.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.memory.unsubscribe(id);
    }
}
