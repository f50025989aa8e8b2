//! Transactional preference editing
//!
//! This crate implements the model behind a preference page:
//!
//! - **Backing stores**: durable `name -> text` maps with defaults and change
//!   notification ([`MemoryStore`], [`FileStore`], [`ScopedStore`])
//! - **Overlay**: an in-memory staging copy of a declared key set that is
//!   written back only on commit ([`OverlayStore`])
//! - **Settings blocks**: composable editing units bound to a subset of keys,
//!   each validating its own input ([`OptionsBlock`],
//!   [`SubstitutionRulesBlock`], [`TabConfigurationBlock`])
//! - **Page**: the lifecycle driving one overlay and its blocks through
//!   load, edit, commit or cancel, and dispose ([`PreferencePage`])
//!
//! Everything is single-threaded. Handles are `Rc`-based and callbacks run
//! synchronously, before the mutating call returns.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use pref_core::{
//!     HeadlessSurface, MemoryStore, OptionsBlock, OverlayStore, PreferencePage,
//!     PreferenceStore, StoreRegistry, TypedKey,
//! };
//!
//! const TAB_WIDTH: TypedKey = TypedKey::int("ui", "editor.tab_width");
//!
//! let ui = Rc::new(MemoryStore::new("ui"));
//! ui.set_default(TAB_WIDTH.name(), "4");
//!
//! let overlay = OverlayStore::new(StoreRegistry::new().with(ui.clone()), []);
//! let block = OptionsBlock::builder("Editor", &overlay)
//!     .number(TAB_WIDTH, "Tab width", 1, 16)
//!     .build();
//!
//! let mut page = PreferencePage::new("Editor", overlay);
//! page.add_block(Rc::new(block));
//! let mut surface = HeadlessSurface::new();
//! page.create_contents(&mut surface);
//!
//! surface.control("editor.tab_width").unwrap().commit("8");
//! page.perform_ok().unwrap();
//! assert_eq!(ui.value(TAB_WIDTH.name()), "8");
//! ```

pub mod block;
pub mod control;
pub mod error;
pub mod key;
pub mod overlay;
pub mod page;
pub mod schema;
pub mod status;
pub mod store;

pub use block::{
    BlockHandle, BlockState, FieldKind, OptionsBlock, OptionsBlockBuilder, SettingsBlock,
    SubstitutionRule, SubstitutionRulesBlock, TabConfigurationBlock,
};
pub use control::{Control, ControlKind, ControlSpec, HeadlessControl, HeadlessSurface, Surface};
pub use error::{Error, Result};
pub use key::{PrefValue, StoreId, TypedKey, ValueType};
pub use overlay::{ListenerId, OverlayStore, PropertyChange};
pub use page::{PageState, PreferencePage};
pub use schema::{KeyDecl, KeySchema};
pub use status::{Severity, Status, StatusAggregator, most_severe};
pub use store::{
    FileStore, MemoryStore, PreferenceStore, ScopedStore, StoreHandle, StoreRegistry,
};
