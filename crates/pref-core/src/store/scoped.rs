//! Project scope layered over workspace scope

use std::rc::{Rc, Weak};

use super::{ListenerList, PreferenceStore, StoreHandle, StoreListener, SubscriptionId};
use crate::Result;
use crate::key::StoreId;

/// A store that writes to a project scope and reads through to a
/// workspace scope.
///
/// - reads: project value, else workspace value
/// - defaults: registered on (and read from) the workspace scope
/// - writes and removals: project scope only
///
/// Workspace changes are forwarded to subscribers unless the project scope
/// overrides the name.
pub struct ScopedStore {
    id: StoreId,
    project: StoreHandle,
    workspace: StoreHandle,
    listeners: Rc<ListenerList>,
    project_subscription: SubscriptionId,
    workspace_subscription: SubscriptionId,
}

impl ScopedStore {
    pub fn new(id: impl Into<StoreId>, project: StoreHandle, workspace: StoreHandle) -> Self {
        let listeners = Rc::new(ListenerList::default());

        let project_subscription = {
            let listeners = Rc::clone(&listeners);
            let project_ref = Rc::downgrade(&project);
            let workspace_ref = Rc::downgrade(&workspace);
            project.subscribe(Rc::new(move |name: &str, _: &str| {
                if let Some(value) = effective(&project_ref, &workspace_ref, name) {
                    listeners.notify(name, &value);
                }
            }))
        };

        let workspace_subscription = {
            let listeners = Rc::clone(&listeners);
            let project_ref = Rc::downgrade(&project);
            workspace.subscribe(Rc::new(move |name: &str, value: &str| {
                let overridden = project_ref
                    .upgrade()
                    .is_some_and(|project| project.read(name).is_some());
                if !overridden {
                    listeners.notify(name, value);
                }
            }))
        };

        Self {
            id: id.into(),
            project,
            workspace,
            listeners,
            project_subscription,
            workspace_subscription,
        }
    }

    pub fn project(&self) -> &StoreHandle {
        &self.project
    }

    pub fn workspace(&self) -> &StoreHandle {
        &self.workspace
    }

    /// Whether the project scope holds a value for any of `names`.
    pub fn has_project_values<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        names
            .into_iter()
            .any(|name| self.project.read(name).is_some())
    }
}

fn effective(project: &Weak<dyn PreferenceStore>, workspace: &Weak<dyn PreferenceStore>, name: &str) -> Option<String> {
    let project = project.upgrade()?;
    let workspace = workspace.upgrade()?;
    Some(
        project
            .read(name)
            .or_else(|| workspace.read(name))
            .or_else(|| workspace.read_default(name))
            .unwrap_or_default(),
    )
}

impl PreferenceStore for ScopedStore {
    fn id(&self) -> &StoreId {
        &self.id
    }

    fn read(&self, name: &str) -> Option<String> {
        self.project
            .read(name)
            .or_else(|| self.workspace.read(name))
    }

    fn read_default(&self, name: &str) -> Option<String> {
        self.workspace
            .read_default(name)
            .or_else(|| self.project.read_default(name))
    }

    fn inherited(&self, name: &str) -> Option<String> {
        self.workspace
            .read(name)
            .or_else(|| self.read_default(name))
    }

    fn set_default(&self, name: &str, value: &str) {
        self.workspace.set_default(name, value);
    }

    fn write(&self, name: &str, value: &str) {
        self.project.write(name, value);
    }

    fn remove(&self, name: &str) {
        self.project.remove(name);
    }

    fn flush(&self) -> Result<()> {
        self.project.flush()
    }

    fn subscribe(&self, listener: StoreListener) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.remove(id);
    }
}

impl Drop for ScopedStore {
    fn drop(&mut self) {
        self.project.unsubscribe(self.project_subscription);
        self.workspace.unsubscribe(self.workspace_subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::cell::RefCell;

    fn scoped() -> (Rc<MemoryStore>, Rc<MemoryStore>, ScopedStore) {
        let project = Rc::new(MemoryStore::new("core"));
        let workspace = Rc::new(MemoryStore::new("core"));
        let store = ScopedStore::new("core", project.clone(), workspace.clone());
        (project, workspace, store)
    }

    #[test]
    fn reads_fall_back_from_project_to_workspace() {
        let (project, workspace, store) = scoped();
        workspace.set_default("indexer.strategy", "fast");
        assert_eq!(store.value("indexer.strategy"), "fast");

        workspace.write("indexer.strategy", "full");
        assert_eq!(store.value("indexer.strategy"), "full");

        project.write("indexer.strategy", "none");
        assert_eq!(store.value("indexer.strategy"), "none");
        assert!(store.has_project_values(["indexer.strategy"]));
    }

    #[test]
    fn writes_land_in_project_scope_only() {
        let (project, workspace, store) = scoped();
        store.write("style", "gnu");

        assert_eq!(project.read("style").as_deref(), Some("gnu"));
        assert_eq!(workspace.read("style"), None);

        store.remove("style");
        assert_eq!(project.read("style"), None);
    }

    #[test]
    fn workspace_value_is_inherited_before_default() {
        let (project, workspace, store) = scoped();
        workspace.set_default("indexer.strategy", "fast");
        assert_eq!(store.inherited("indexer.strategy").as_deref(), Some("fast"));

        workspace.write("indexer.strategy", "full");
        project.write("indexer.strategy", "none");
        assert_eq!(store.inherited("indexer.strategy").as_deref(), Some("full"));
    }

    #[test]
    fn masked_workspace_changes_are_not_forwarded() {
        let (project, workspace, store) = scoped();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(Rc::new(move |name: &str, value: &str| {
            sink.borrow_mut().push(format!("{name}={value}"));
        }));

        workspace.write("a", "1");
        project.write("a", "2");
        workspace.write("a", "3");
        project.remove("a");

        assert_eq!(*seen.borrow(), vec!["a=1", "a=2", "a=3"]);
    }

    #[test]
    fn dropping_scoped_store_unsubscribes() {
        let (project, workspace, store) = scoped();
        assert_eq!(project.subscriber_count(), 1);
        drop(store);
        assert_eq!(project.subscriber_count(), 0);
        assert_eq!(workspace.subscriber_count(), 0);
    }
}
