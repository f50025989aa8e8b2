//! Tabbed composition of settings blocks

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::{BlockCore, BlockHandle, BlockState, SettingsBlock};
use crate::Result;
use crate::control::Surface;
use crate::key::TypedKey;
use crate::status::{Status, StatusAggregator, StatusListener};

/// A block whose children are shown as tabs.
///
/// The container's status is the worst of its children's last statuses.
/// Commit runs children in order and stops at the first failure; dispose
/// always reaches every child.
#[derive(Clone)]
pub struct TabConfigurationBlock {
    inner: Rc<Inner>,
}

struct Inner {
    core: BlockCore,
    children: Vec<BlockHandle>,
    aggregator: RefCell<StatusAggregator>,
    selected: Cell<usize>,
}

impl TabConfigurationBlock {
    pub fn new(name: impl Into<String>, children: Vec<BlockHandle>) -> Self {
        let mut aggregator = StatusAggregator::new();
        for child in &children {
            let source = aggregator.add_source();
            aggregator.report(source, child.status());
        }

        let inner = Rc::new(Inner {
            core: BlockCore::new(name),
            children,
            aggregator: RefCell::new(aggregator),
            selected: Cell::new(0),
        });

        for (source, child) in inner.children.iter().enumerate() {
            let weak: Weak<Inner> = Rc::downgrade(&inner);
            child.connect(Rc::new(move |status: &Status| {
                if let Some(inner) = weak.upgrade() {
                    inner.child_status(source, status.clone());
                }
            }));
        }

        inner.core.publish(inner.aggregator.borrow().aggregate());
        Self { inner }
    }

    pub fn children(&self) -> &[BlockHandle] {
        &self.inner.children
    }

    /// Select the visible tab; out-of-range indices are ignored.
    pub fn select_tab(&self, index: usize) {
        if index < self.inner.children.len() {
            self.inner.selected.set(index);
        }
    }

    pub fn selected_tab(&self) -> usize {
        self.inner.selected.get()
    }
}

impl Inner {
    fn child_status(&self, source: usize, status: Status) {
        let aggregate = self.aggregator.borrow_mut().report(source, status);
        self.core.publish(aggregate);
    }
}

impl SettingsBlock for TabConfigurationBlock {
    fn name(&self) -> &str {
        self.inner.core.name()
    }

    fn owned_keys(&self) -> Vec<TypedKey> {
        let mut keys: Vec<TypedKey> = Vec::new();
        for key in self.inner.children.iter().flat_map(|child| child.owned_keys()) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    fn connect(&self, listener: StatusListener) {
        self.inner.core.connect(listener);
    }

    fn create_contents(&self, surface: &mut dyn Surface) {
        self.inner.core.bind();
        for child in &self.inner.children {
            surface.begin_group(child.name());
            child.create_contents(surface);
            surface.end_group();
        }
    }

    fn status(&self) -> Status {
        self.inner.core.status()
    }

    fn state(&self) -> BlockState {
        self.inner.core.state()
    }

    fn set_enabled(&self, enabled: bool) {
        self.inner.core.set_enabled(enabled);
        for child in &self.inner.children {
            child.set_enabled(enabled);
        }
    }

    fn perform_ok(&self) -> Result<()> {
        for child in &self.inner.children {
            child.perform_ok()?;
        }
        self.inner.core.set_state(BlockState::Committed);
        Ok(())
    }

    fn perform_defaults(&self) {
        for child in &self.inner.children {
            child.perform_defaults();
        }
    }

    fn perform_cancel(&self) {
        for child in &self.inner.children {
            child.perform_cancel();
        }
        self.inner.core.set_state(BlockState::Discarded);
    }

    fn refresh(&self) {
        for child in &self.inner.children {
            child.refresh();
        }
    }

    fn dispose(&self) -> Result<()> {
        if !self.inner.core.begin_dispose() {
            return Ok(());
        }
        let mut first = None;
        for child in &self.inner.children {
            if let Err(err) = child.dispose() {
                tracing::warn!(block = %child.name(), error = %err, "Failed to dispose tab");
                first.get_or_insert(err);
            }
        }
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
