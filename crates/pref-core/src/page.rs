//! Preference page lifecycle
//!
//! A [`PreferencePage`] owns one [`OverlayStore`] and an ordered list of
//! blocks sharing it, and drives them through
//! `Constructed -> ControlsCreated -> Committed | Cancelled -> Disposed`.
//! Commit is all-or-nothing up to propagation: a block refusing to commit
//! or an error status leaves the backing stores untouched. A failed flush
//! leaves the page open with its edits intact so the user can retry.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::block::BlockHandle;
use crate::control::Surface;
use crate::overlay::OverlayStore;
use crate::status::{Status, StatusAggregator, StatusListener};
use crate::{Error, Result};

/// Lifecycle state of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Constructed,
    ControlsCreated,
    Committed,
    Cancelled,
    Disposed,
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Constructed => "constructed",
            Self::ControlsCreated => "open",
            Self::Committed => "committed",
            Self::Cancelled => "cancelled",
            Self::Disposed => "disposed",
        };
        f.write_str(label)
    }
}

#[derive(Default)]
struct PageStatus {
    aggregator: RefCell<StatusAggregator>,
    listeners: RefCell<Vec<StatusListener>>,
}

impl PageStatus {
    fn report(&self, source: usize, status: Status) {
        let aggregate = self.aggregator.borrow_mut().report(source, status);
        let listeners: Vec<StatusListener> = self.listeners.borrow().clone();
        for listener in listeners {
            listener(&aggregate);
        }
    }
}

/// A page of settings blocks over one overlay.
pub struct PreferencePage {
    title: String,
    overlay: Option<OverlayStore>,
    blocks: Vec<BlockHandle>,
    status: Rc<PageStatus>,
    state: PageState,
    project_settings: bool,
}

impl PreferencePage {
    pub fn new(title: impl Into<String>, overlay: OverlayStore) -> Self {
        Self {
            title: title.into(),
            overlay: Some(overlay),
            blocks: Vec::new(),
            status: Rc::new(PageStatus::default()),
            state: PageState::Constructed,
            project_settings: true,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// The page's overlay; `None` once disposed.
    pub fn overlay(&self) -> Option<&OverlayStore> {
        self.overlay.as_ref()
    }

    pub fn blocks(&self) -> &[BlockHandle] {
        &self.blocks
    }

    /// Append a block. Blocks commit in the order they were added.
    ///
    /// # Panics
    ///
    /// If controls were already created.
    pub fn add_block(&mut self, block: BlockHandle) {
        assert_eq!(
            self.state,
            PageState::Constructed,
            "blocks must be added to page '{}' before its controls are created",
            self.title
        );
        let source = {
            let mut aggregator = self.status.aggregator.borrow_mut();
            let source = aggregator.add_source();
            aggregator.report(source, block.status());
            source
        };
        let weak: Weak<PageStatus> = Rc::downgrade(&self.status);
        block.connect(Rc::new(move |status: &Status| {
            if let Some(page) = weak.upgrade() {
                page.report(source, status.clone());
            }
        }));
        self.blocks.push(block);
    }

    /// Observe the aggregated status (e.g. to enable the OK button).
    pub fn on_status_change(&self, listener: impl Fn(&Status) + 'static) {
        self.status.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Worst status across all blocks.
    pub fn status(&self) -> Status {
        self.status.aggregator.borrow().aggregate()
    }

    /// Block validation does not gate a commit while project-specific
    /// settings are off.
    pub fn can_commit(&self) -> bool {
        !self.project_settings || self.status.aggregator.borrow().can_commit()
    }

    /// Load and start the overlay, then create every block's controls.
    ///
    /// # Panics
    ///
    /// If called more than once.
    pub fn create_contents(&mut self, surface: &mut dyn Surface) {
        assert_eq!(
            self.state,
            PageState::Constructed,
            "create_contents called twice on page '{}'",
            self.title
        );
        let Some(overlay) = self.overlay.clone() else {
            return;
        };
        overlay.load();
        overlay.start();
        for block in &self.blocks {
            block.create_contents(surface);
            if !self.project_settings {
                block.set_enabled(false);
            }
        }
        self.state = PageState::ControlsCreated;
        tracing::debug!(page = %self.title, blocks = self.blocks.len(), "Created page contents");
    }

    /// Commit and close.
    pub fn perform_ok(&mut self) -> Result<()> {
        self.commit()?;
        self.state = PageState::Committed;
        Ok(())
    }

    /// Commit and keep the page open.
    pub fn perform_apply(&mut self) -> Result<()> {
        self.commit()
    }

    /// Close without writing anything back.
    pub fn perform_cancel(&mut self) {
        if self.state != PageState::ControlsCreated {
            tracing::debug!(page = %self.title, state = %self.state, "Ignoring cancel");
            return;
        }
        for block in &self.blocks {
            block.perform_cancel();
        }
        self.state = PageState::Cancelled;
    }

    /// Reset the overlay to the stores' defaults, then let blocks refresh.
    pub fn perform_defaults(&mut self) -> Result<()> {
        let overlay = self.ensure_open()?;
        overlay.load_defaults();
        for block in &self.blocks {
            block.perform_defaults();
        }
        Ok(())
    }

    /// Discard unapplied edits by reloading the overlay.
    pub fn perform_revert(&mut self) -> Result<()> {
        let overlay = self.ensure_open()?;
        overlay.load();
        for block in &self.blocks {
            block.refresh();
        }
        Ok(())
    }

    pub fn project_settings(&self) -> bool {
        self.project_settings
    }

    /// Turn project-specific settings on or off.
    ///
    /// While off, blocks are disabled and commit removes this page's keys
    /// from the backing stores instead of propagating. Pending block edits
    /// and their validation errors are then dropped.
    pub fn set_project_settings(&mut self, enabled: bool) {
        self.project_settings = enabled;
        if self.state == PageState::ControlsCreated {
            for block in &self.blocks {
                block.set_enabled(enabled);
            }
        }
    }

    /// Stop the overlay and dispose every block. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.state == PageState::Disposed {
            return;
        }
        if let Some(overlay) = self.overlay.take() {
            overlay.stop();
        }
        for block in &self.blocks {
            if let Err(err) = block.dispose() {
                tracing::warn!(page = %self.title, error = %err, "Failed to dispose block");
            }
        }
        self.state = PageState::Disposed;
        tracing::debug!(page = %self.title, "Disposed page");
    }

    fn ensure_open(&self) -> Result<OverlayStore> {
        match (&self.overlay, self.state) {
            (Some(overlay), PageState::ControlsCreated) => Ok(overlay.clone()),
            _ => Err(Error::PageNotOpen {
                page: self.title.clone(),
                state: self.state.to_string(),
            }),
        }
    }

    fn commit(&mut self) -> Result<()> {
        let overlay = self.ensure_open()?;
        if self.project_settings {
            let status = self.status();
            if status.is_error() {
                return Err(Error::InvalidStatus {
                    message: status.message().to_string(),
                });
            }

            for block in &self.blocks {
                if let Err(err) = block.perform_ok() {
                    tracing::warn!(page = %self.title, block = %block.name(), error = %err, "Commit aborted");
                    return Err(err);
                }
            }
            overlay.propagate();
        } else {
            overlay.remove_from_backing();
            overlay.load();
            for block in &self.blocks {
                block.refresh();
            }
        }

        let mut first = None;
        for store in overlay.stores() {
            if let Err(err) = store.flush() {
                tracing::warn!(store = %store.id(), error = %err, "Failed to flush preference store");
                first.get_or_insert(err);
            }
        }
        match first {
            Some(err) => Err(err),
            None => {
                tracing::debug!(page = %self.title, "Committed page");
                Ok(())
            }
        }
    }
}

impl Drop for PreferencePage {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for PreferencePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferencePage")
            .field("title", &self.title)
            .field("state", &self.state)
            .field("blocks", &self.blocks.len())
            .field("project_settings", &self.project_settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{OptionsBlock, SettingsBlock};
    use crate::control::{Control, HeadlessSurface};
    use crate::key::TypedKey;
    use crate::store::{FileStore, MemoryStore, PreferenceStore, StoreRegistry};
    use pretty_assertions::assert_eq;

    const TAB_WIDTH: TypedKey = TypedKey::int("ui", "editor.tab_width");
    const FOLDING: TypedKey = TypedKey::boolean("ui", "editor.folding");

    fn page_over(store: Rc<dyn PreferenceStore>) -> (PreferencePage, HeadlessSurface) {
        store.set_default(TAB_WIDTH.name(), "4");
        store.set_default(FOLDING.name(), "true");
        let overlay = OverlayStore::new(StoreRegistry::new().with(store), []);
        let block = OptionsBlock::builder("Editor", &overlay)
            .number(TAB_WIDTH, "Tab width", 1, 16)
            .checkbox(FOLDING, "Enable folding")
            .build();
        let mut page = PreferencePage::new("Editor", overlay);
        page.add_block(Rc::new(block));
        let mut surface = HeadlessSurface::new();
        page.create_contents(&mut surface);
        (page, surface)
    }

    #[test]
    fn ok_propagates_edits() {
        let ui = Rc::new(MemoryStore::new("ui"));
        let (mut page, surface) = page_over(ui.clone());

        surface.control("editor.tab_width").unwrap().commit("8");
        page.perform_ok().unwrap();

        assert_eq!(ui.read(TAB_WIDTH.name()).as_deref(), Some("8"));
        assert_eq!(page.state(), PageState::Committed);
    }

    #[test]
    fn error_status_blocks_commit() {
        let ui = Rc::new(MemoryStore::new("ui"));
        let (mut page, surface) = page_over(ui.clone());

        surface.control("editor.tab_width").unwrap().commit("0");
        assert!(!page.can_commit());

        let err = page.perform_ok().unwrap_err();
        assert!(matches!(err, Error::InvalidStatus { .. }));
        assert_eq!(page.state(), PageState::ControlsCreated);
        assert_eq!(ui.read(TAB_WIDTH.name()), None);
    }

    #[test]
    fn cancel_leaves_stores_untouched() {
        let ui = Rc::new(MemoryStore::new("ui"));
        let (mut page, surface) = page_over(ui.clone());

        surface.control("editor.folding").unwrap().commit("false");
        page.perform_cancel();

        assert_eq!(ui.value(FOLDING.name()), "true");
        assert_eq!(page.state(), PageState::Cancelled);
        assert!(matches!(page.perform_ok(), Err(Error::PageNotOpen { .. })));
    }

    #[test]
    fn defaults_reset_overlay_before_blocks_refresh() {
        let ui = Rc::new(MemoryStore::new("ui"));
        ui.write(TAB_WIDTH.name(), "2");
        let (mut page, surface) = page_over(ui.clone());
        assert_eq!(surface.control("editor.tab_width").unwrap().value(), "2");

        page.perform_defaults().unwrap();

        assert_eq!(surface.control("editor.tab_width").unwrap().value(), "4");
        assert_eq!(ui.value(TAB_WIDTH.name()), "2");
    }

    #[test]
    fn revert_restores_stored_values() {
        let ui = Rc::new(MemoryStore::new("ui"));
        let (mut page, surface) = page_over(ui.clone());
        let tab_width = surface.control("editor.tab_width").unwrap();

        tab_width.commit("12");
        page.perform_revert().unwrap();

        assert_eq!(tab_width.value(), "4");
        assert_eq!(page.overlay().unwrap().get_int(&TAB_WIDTH), 4);
    }

    #[test]
    fn flush_failure_keeps_page_open_with_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui.toml");
        let store = Rc::new(FileStore::open("ui", &path).unwrap());
        let (mut page, surface) = page_over(store.clone());
        std::fs::create_dir(&path).unwrap();

        surface.control("editor.tab_width").unwrap().commit("6");
        let err = page.perform_ok().unwrap_err();

        assert!(matches!(err, Error::Persistence { .. }));
        assert_eq!(page.state(), PageState::ControlsCreated);
        assert_eq!(page.overlay().unwrap().get_int(&TAB_WIDTH), 6);

        std::fs::remove_dir(&path).unwrap();
        page.perform_ok().unwrap();
        assert!(!store.is_dirty());
    }

    #[test]
    fn project_settings_off_disables_blocks_and_clears_keys() {
        let ui = Rc::new(MemoryStore::new("ui"));
        ui.write(TAB_WIDTH.name(), "8");
        let (mut page, surface) = page_over(ui.clone());

        page.set_project_settings(false);
        assert!(!surface.control("editor.tab_width").unwrap().commit("2"));
        page.perform_ok().unwrap();

        assert_eq!(ui.read(TAB_WIDTH.name()), None);
    }

    #[test]
    fn invalid_edit_does_not_block_commit_with_project_settings_off() {
        let ui = Rc::new(MemoryStore::new("ui"));
        ui.write(TAB_WIDTH.name(), "8");
        let (mut page, surface) = page_over(ui.clone());

        surface.control("editor.tab_width").unwrap().commit("0");
        assert!(page.status().is_error());
        page.set_project_settings(false);
        assert!(page.can_commit());

        page.perform_apply().unwrap();

        assert_eq!(ui.read(TAB_WIDTH.name()), None);
        assert_eq!(surface.control("editor.tab_width").unwrap().value(), "4");
        assert!(page.status().is_ok());

        page.set_project_settings(true);
        assert!(page.can_commit());
        page.perform_ok().unwrap();
    }

    #[test]
    fn dispose_is_idempotent() {
        let ui = Rc::new(MemoryStore::new("ui"));
        let (mut page, _surface) = page_over(ui.clone());
        assert_eq!(ui.subscriber_count(), 1);

        page.dispose();
        page.dispose();

        assert_eq!(ui.subscriber_count(), 0);
        assert!(page.overlay().is_none());
        assert!(page.blocks().iter().all(|block| block.state() == crate::BlockState::Disposed));
    }

    #[test]
    fn status_listeners_see_the_aggregate() {
        let ui = Rc::new(MemoryStore::new("ui"));
        let (page, surface) = page_over(ui);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        page.on_status_change(move |status| sink.borrow_mut().push(status.is_error()));

        surface.control("editor.tab_width").unwrap().commit("99");
        surface.control("editor.tab_width").unwrap().commit("9");

        assert_eq!(*seen.borrow(), vec![true, false]);
    }
}
