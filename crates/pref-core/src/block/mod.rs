//! Composable settings blocks
//!
//! A block owns a subset of the overlay's keys, binds controls to them,
//! validates after every edit and publishes its [`Status`] to whoever
//! connected to it: a [`TabConfigurationBlock`] or a
//! [`PreferencePage`](crate::PreferencePage).
//!
//! Lifecycle: `Unbound -> Bound -> Editing -> Committed | Discarded`, then
//! `Disposed`. Resetting (defaults, revert) refreshes controls without
//! leaving the editing state.

mod options;
mod rules;
mod tabs;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

pub use options::{DisposeHook, FieldKind, OptionsBlock, OptionsBlockBuilder, Validator};
pub use rules::{SubstitutionRule, SubstitutionRulesBlock};
pub use tabs::TabConfigurationBlock;

use crate::Result;
use crate::control::Surface;
use crate::key::TypedKey;
use crate::status::{Status, StatusListener};

/// Lifecycle state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Unbound,
    Bound,
    Editing,
    Committed,
    Discarded,
    Disposed,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unbound => "unbound",
            Self::Bound => "bound",
            Self::Editing => "editing",
            Self::Committed => "committed",
            Self::Discarded => "discarded",
            Self::Disposed => "disposed",
        };
        f.write_str(label)
    }
}

/// A self-contained editing unit bound to a subset of preference keys.
pub trait SettingsBlock {
    fn name(&self) -> &str;

    /// Keys this block reads and writes.
    fn owned_keys(&self) -> Vec<TypedKey>;

    /// Route status updates to `listener`, replacing any previous one.
    fn connect(&self, listener: StatusListener);

    /// Create and bind controls. Called exactly once per block.
    fn create_contents(&self, surface: &mut dyn Surface);

    fn status(&self) -> Status;

    fn state(&self) -> BlockState;

    /// Disabled blocks ignore control input.
    fn set_enabled(&self, enabled: bool);

    /// Final writes before the overlay is propagated. An error aborts the
    /// page commit.
    fn perform_ok(&self) -> Result<()>;

    /// Restore defaults for owned keys and refresh controls.
    fn perform_defaults(&self);

    /// Discard block-local state that never reached the overlay.
    fn perform_cancel(&self);

    /// Re-read controls from the overlay (after a reload).
    fn refresh(&self);

    /// Release resources. Safe to call more than once.
    fn dispose(&self) -> Result<()>;
}

/// Shared handle to a block.
pub type BlockHandle = Rc<dyn SettingsBlock>;

/// State and status plumbing shared by the block implementations.
pub(crate) struct BlockCore {
    name: String,
    state: Cell<BlockState>,
    enabled: Cell<bool>,
    status: RefCell<Status>,
    listener: RefCell<Option<StatusListener>>,
}

impl BlockCore {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Cell::new(BlockState::Unbound),
            enabled: Cell::new(true),
            status: RefCell::new(Status::ok()),
            listener: RefCell::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> BlockState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: BlockState) {
        self.state.set(state);
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub(crate) fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    pub(crate) fn connect(&self, listener: StatusListener) {
        self.listener.replace(Some(listener));
    }

    /// Move from `Unbound` to `Bound`.
    ///
    /// # Panics
    ///
    /// If controls were already created.
    pub(crate) fn bind(&self) {
        assert_eq!(
            self.state.get(),
            BlockState::Unbound,
            "create_contents called twice on block '{}'",
            self.name
        );
        self.state.set(BlockState::Bound);
    }

    pub(crate) fn mark_editing(&self) {
        if self.state.get() == BlockState::Bound {
            self.state.set(BlockState::Editing);
        }
    }

    /// Mark disposed; returns `false` if it already was.
    pub(crate) fn begin_dispose(&self) -> bool {
        self.state.replace(BlockState::Disposed) != BlockState::Disposed
    }

    /// Store and forward a new status. The listener runs with no borrow held.
    pub(crate) fn publish(&self, status: Status) {
        self.status.replace(status.clone());
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(&status);
        }
    }
}
