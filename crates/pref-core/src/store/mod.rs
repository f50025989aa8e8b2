//! Backing preference stores
//!
//! The overlay consumes durable preferences through the narrow
//! [`PreferenceStore`] interface. Stores are shared by reference
//! ([`StoreHandle`]) and use interior mutability, so a change callback can
//! run without any outstanding borrow on the store that fired it.

mod file;
mod memory;
mod registry;
mod scoped;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use registry::StoreRegistry;
pub use scoped::ScopedStore;

use crate::Result;
use crate::key::StoreId;

/// Callback invoked with `(name, new_text)` when a store value changes.
pub type StoreListener = Rc<dyn Fn(&str, &str)>;

/// Shared handle to a backing store.
pub type StoreHandle = Rc<dyn PreferenceStore>;

/// Token returned by [`PreferenceStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A scoped, durable key-value preference store.
///
/// Values and defaults are text. The effective value of a name is its
/// explicit value, else its registered default, else the empty string.
pub trait PreferenceStore {
    fn id(&self) -> &StoreId;

    /// Explicitly set value, if any.
    fn read(&self, name: &str) -> Option<String>;

    /// Registered default, if any.
    fn read_default(&self, name: &str) -> Option<String>;

    /// Register the default for `name`.
    fn set_default(&self, name: &str, value: &str);

    /// Set an explicit value in memory. Durable only after [`flush`](Self::flush).
    fn write(&self, name: &str, value: &str);

    /// Drop the explicit value so the default applies again.
    fn remove(&self, name: &str);

    /// Persist pending writes.
    fn flush(&self) -> Result<()>;

    /// Register a change callback. Callbacks fire after the store state is
    /// updated and only when the effective value changed.
    fn subscribe(&self, listener: StoreListener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);

    /// Value `name` takes when it has no explicit entry of its own.
    fn inherited(&self, name: &str) -> Option<String> {
        self.read_default(name)
    }

    fn contains(&self, name: &str) -> bool {
        self.read(name).is_some()
    }

    /// Effective value: explicit, else default, else `""`.
    fn value(&self, name: &str) -> String {
        self.read(name)
            .or_else(|| self.read_default(name))
            .unwrap_or_default()
    }
}

/// Subscriber list shared by the store implementations.
#[derive(Default)]
pub(crate) struct ListenerList {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(SubscriptionId, StoreListener)>>,
}

impl ListenerList {
    pub(crate) fn add(&self, listener: StoreListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: SubscriptionId) {
        self.entries.borrow_mut().retain(|(entry, _)| *entry != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Invoke every listener on a snapshot, so listeners may (un)subscribe.
    pub(crate) fn notify(&self, name: &str, value: &str) {
        let snapshot: Vec<StoreListener> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(name, value);
        }
    }
}
