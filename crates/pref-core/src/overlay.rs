//! Transactional staging of preference edits
//!
//! An [`OverlayStore`] copies the current values of a declared key set out
//! of their backing stores on [`load`](OverlayStore::load), serves reads and
//! writes from that in-memory copy, and writes back only on
//! [`propagate`](OverlayStore::propagate). Discarding an edit session is
//! simply never propagating it.
//!
//! The handle is cheap to clone; every block on a page shares the same
//! overlay. No borrow is held while listeners run, so listeners may read or
//! write the overlay re-entrantly.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::key::{PrefValue, StoreId, TypedKey, parse_bool, parse_int};
use crate::store::{StoreHandle, StoreRegistry, SubscriptionId};

/// A value change delivered to overlay listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    pub key: TypedKey,
    pub old_value: String,
    pub new_value: String,
}

/// Callback invoked for every [`PropertyChange`] while the overlay is started.
pub type PropertyListener = Rc<dyn Fn(&PropertyChange)>;

/// Token returned by [`OverlayStore::add_property_change_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// In-memory overlay over one or more backing stores.
#[derive(Clone)]
pub struct OverlayStore {
    inner: Rc<Inner>,
}

struct Inner {
    stores: StoreRegistry,
    keys: RefCell<Vec<TypedKey>>,
    values: RefCell<HashMap<TypedKey, String>>,
    loaded: Cell<bool>,
    started: Cell<bool>,
    subscriptions: RefCell<Vec<(StoreHandle, SubscriptionId)>>,
    listeners: RefCell<Vec<(ListenerId, PropertyListener)>>,
    next_listener: Cell<u64>,
}

impl OverlayStore {
    /// Create an overlay for `keys`, resolving each key's store in `stores`.
    ///
    /// # Panics
    ///
    /// If a key names a store that is not registered.
    pub fn new(stores: StoreRegistry, keys: impl IntoIterator<Item = TypedKey>) -> Self {
        let overlay = Self {
            inner: Rc::new(Inner {
                stores,
                keys: RefCell::new(Vec::new()),
                values: RefCell::new(HashMap::new()),
                loaded: Cell::new(false),
                started: Cell::new(false),
                subscriptions: RefCell::new(Vec::new()),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        };
        overlay.add_keys(keys);
        overlay
    }

    /// Append keys not yet declared; duplicates are ignored.
    ///
    /// Keys added after [`load`](Self::load) are initialized from their
    /// backing store. While started, the new keys' stores are watched too.
    pub fn add_keys(&self, keys: impl IntoIterator<Item = TypedKey>) {
        let mut added = Vec::new();
        {
            let mut declared = self.inner.keys.borrow_mut();
            for key in keys {
                self.backing(&key);
                if !declared.contains(&key) {
                    declared.push(key.clone());
                    added.push(key);
                }
            }
        }

        if self.inner.loaded.get() {
            let initial: Vec<(TypedKey, String)> = added
                .into_iter()
                .map(|key| {
                    let value = self.backing(&key).value(key.name());
                    (key, value)
                })
                .collect();
            self.inner.values.borrow_mut().extend(initial);
        }

        if self.inner.started.get() {
            self.watch_stores();
        }
    }

    /// Declared keys in declaration order.
    pub fn keys(&self) -> Vec<TypedKey> {
        self.inner.keys.borrow().clone()
    }

    pub fn contains(&self, key: &TypedKey) -> bool {
        self.inner.keys.borrow().contains(key)
    }

    /// Distinct backing stores referenced by the declared keys.
    pub fn stores(&self) -> Vec<StoreHandle> {
        let mut seen: Vec<StoreId> = Vec::new();
        let mut stores = Vec::new();
        for key in self.inner.keys.borrow().iter() {
            if !seen.contains(key.store()) {
                seen.push(key.store().clone());
                stores.push(self.backing(key));
            }
        }
        stores
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.loaded.get()
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.get()
    }

    /// Copy every declared key's current backing value into the overlay.
    ///
    /// No listener is notified. Calling this again discards unpropagated
    /// edits.
    pub fn load(&self) {
        let snapshot: Vec<(TypedKey, String)> = self
            .keys()
            .into_iter()
            .map(|key| {
                let value = self.backing(&key).value(key.name());
                (key, value)
            })
            .collect();

        let count = snapshot.len();
        {
            let mut values = self.inner.values.borrow_mut();
            values.clear();
            values.extend(snapshot);
        }
        self.inner.loaded.set(true);
        tracing::debug!(keys = count, "Loaded overlay from backing stores");
    }

    /// Replace every overlay value with its backing store's registered
    /// default. The backing stores are not modified.
    ///
    /// This is a bulk edit: listeners are notified per key while started.
    pub fn load_defaults(&self) {
        for key in self.keys() {
            let default = self.default_text(&key);
            self.store_value(&key, default);
        }
        tracing::debug!("Loaded overlay defaults");
    }

    /// Start mirroring backing-store changes and delivering notifications.
    pub fn start(&self) {
        if self.inner.started.replace(true) {
            return;
        }
        self.watch_stores();
    }

    /// Stop mirroring and notifications. Safe to call repeatedly.
    pub fn stop(&self) {
        if !self.inner.started.replace(false) {
            return;
        }
        let subscriptions = self.inner.subscriptions.take();
        for (store, id) in subscriptions {
            store.unsubscribe(id);
        }
    }

    /// Write every overlay value into its backing store (in memory only).
    ///
    /// A value equal to what the store would inherit without an explicit
    /// entry (its default, or an outer scope's value) clears the entry
    /// instead, so the effective value is the same either way.
    pub fn propagate(&self) {
        let pending: Vec<(TypedKey, String)> = {
            let values = self.inner.values.borrow();
            self.inner
                .keys
                .borrow()
                .iter()
                .filter_map(|key| values.get(key).map(|value| (key.clone(), value.clone())))
                .collect()
        };

        for (key, value) in &pending {
            let store = self.backing(key);
            let inherited = store.inherited(key.name()).as_deref() == Some(value.as_str());
            if inherited {
                if store.read(key.name()).is_some() {
                    store.remove(key.name());
                }
            } else {
                store.write(key.name(), value);
            }
        }
        tracing::debug!(keys = pending.len(), "Propagated overlay to backing stores");
    }

    /// Remove every declared key's explicit value from its backing store.
    pub fn remove_from_backing(&self) {
        for key in self.keys() {
            self.backing(&key).remove(key.name());
        }
    }

    pub fn get_string(&self, key: &TypedKey) -> String {
        self.text(key).unwrap_or_default()
    }

    /// Boolean value; `false` when undeclared or unparsable.
    pub fn get_boolean(&self, key: &TypedKey) -> bool {
        self.text(key)
            .and_then(|text| {
                let parsed = parse_bool(&text);
                if parsed.is_none() {
                    tracing::debug!(%key, value = %text, "Unparsable boolean preference");
                }
                parsed
            })
            .unwrap_or(false)
    }

    /// Integer value; `0` when undeclared or unparsable.
    pub fn get_int(&self, key: &TypedKey) -> i32 {
        self.text(key)
            .and_then(|text| {
                let parsed = parse_int(&text);
                if parsed.is_none() {
                    tracing::debug!(%key, value = %text, "Unparsable integer preference");
                }
                parsed
            })
            .unwrap_or(0)
    }

    pub fn get_default_string(&self, key: &TypedKey) -> String {
        self.default_text(key)
    }

    pub fn get_default_boolean(&self, key: &TypedKey) -> bool {
        parse_bool(&self.default_text(key)).unwrap_or(false)
    }

    pub fn get_default_int(&self, key: &TypedKey) -> i32 {
        parse_int(&self.default_text(key)).unwrap_or(0)
    }

    /// Whether the overlay value equals the backing store's default.
    pub fn is_default(&self, key: &TypedKey) -> bool {
        self.get_string(key) == self.default_text(key)
    }

    /// Stage `value` for `key`, notifying listeners before returning when
    /// started.
    ///
    /// # Panics
    ///
    /// If `key` was never declared; that is a wiring bug, not user input.
    pub fn set_value(&self, key: &TypedKey, value: impl Into<PrefValue>) {
        assert!(
            self.contains(key),
            "preference key {key} is not declared in this overlay"
        );
        self.store_value(key, value.into().to_text());
    }

    /// Stage the backing store's default for `key`.
    pub fn set_to_default(&self, key: &TypedKey) {
        let default = self.default_text(key);
        self.set_value(key, default);
    }

    pub fn add_property_change_listener(
        &self,
        listener: impl Fn(&PropertyChange) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        id
    }

    pub fn remove_property_change_listener(&self, id: ListenerId) {
        self.inner
            .listeners
            .borrow_mut()
            .retain(|(entry, _)| *entry != id);
    }

    fn backing(&self, key: &TypedKey) -> StoreHandle {
        match self.inner.stores.get(key.store()) {
            Some(store) => Rc::clone(store),
            None => panic!(
                "preference key {key} refers to unregistered store '{}'",
                key.store()
            ),
        }
    }

    fn text(&self, key: &TypedKey) -> Option<String> {
        if !self.contains(key) {
            tracing::warn!(%key, "Read of undeclared preference key");
            return None;
        }
        self.inner.values.borrow().get(key).cloned()
    }

    fn default_text(&self, key: &TypedKey) -> String {
        self.backing(key)
            .read_default(key.name())
            .unwrap_or_default()
    }

    fn store_value(&self, key: &TypedKey, new_value: String) {
        let old_value = self
            .inner
            .values
            .borrow_mut()
            .insert(key.clone(), new_value.clone())
            .unwrap_or_default();

        if self.inner.started.get() {
            self.fire(&PropertyChange {
                key: key.clone(),
                old_value,
                new_value,
            });
        }
    }

    fn fire(&self, change: &PropertyChange) {
        let snapshot: Vec<PropertyListener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(change);
        }
    }

    /// Subscribe to every referenced store not yet watched.
    fn watch_stores(&self) {
        for store in self.stores() {
            let watched = self
                .inner
                .subscriptions
                .borrow()
                .iter()
                .any(|(existing, _)| existing.id() == store.id());
            if watched {
                continue;
            }

            let weak: Weak<Inner> = Rc::downgrade(&self.inner);
            let store_id = store.id().clone();
            let id = store.subscribe(Rc::new(move |name: &str, value: &str| {
                if let Some(inner) = weak.upgrade() {
                    OverlayStore { inner }.mirror(&store_id, name, value);
                }
            }));
            self.inner.subscriptions.borrow_mut().push((store, id));
        }
    }

    /// Apply an external backing-store change to the matching declared key.
    fn mirror(&self, store: &StoreId, name: &str, value: &str) {
        if !self.inner.started.get() {
            return;
        }
        let key = self
            .inner
            .keys
            .borrow()
            .iter()
            .find(|key| key.name() == name && key.store() == store)
            .cloned();
        let Some(key) = key else {
            return;
        };
        let unchanged = self.inner.values.borrow().get(&key).map(String::as_str) == Some(value);
        if !unchanged {
            tracing::debug!(%key, "Mirroring external preference change");
            self.store_value(&key, value.to_string());
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for (store, id) in self.subscriptions.take() {
            store.unsubscribe(id);
        }
    }
}

impl fmt::Debug for OverlayStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayStore")
            .field("keys", &self.inner.keys.borrow().len())
            .field("loaded", &self.inner.loaded.get())
            .field("started", &self.inner.started.get())
            .finish()
    }
}
