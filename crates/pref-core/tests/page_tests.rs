use std::cell::RefCell;
use std::rc::Rc;

use pref_core::{
    BlockState, Control, Error, HeadlessSurface, MemoryStore, OptionsBlock, OverlayStore, PageState,
    PreferencePage, PreferenceStore, ScopedStore, SettingsBlock, StoreRegistry, TypedKey,
};
use pref_test_utils::dir::TestStoreDir;
use pref_test_utils::stores::{FailingStore, RecordingStore};
use pretty_assertions::assert_eq;

const FOLDING: TypedKey = TypedKey::boolean("ui", "editor.folding");
const TAB_WIDTH: TypedKey = TypedKey::int("ui", "editor.tab_width");
const STYLE: TypedKey = TypedKey::string("core", "formatter.style");

fn editor_page(stores: StoreRegistry) -> (PreferencePage, HeadlessSurface) {
    for store in stores.iter() {
        store.set_default(FOLDING.name(), "true");
        store.set_default(TAB_WIDTH.name(), "4");
        store.set_default(STYLE.name(), "K&R");
    }
    let overlay = OverlayStore::new(stores, []);
    let editor = OptionsBlock::builder("Editor", &overlay)
        .checkbox(FOLDING, "Enable folding")
        .number(TAB_WIDTH, "Tab width", 1, 16)
        .build();
    let formatter = OptionsBlock::builder("Formatter", &overlay)
        .combo(STYLE, "Style", ["K&R", "GNU", "Allman"])
        .build();

    let mut page = PreferencePage::new("Editor", overlay);
    page.add_block(Rc::new(editor));
    page.add_block(Rc::new(formatter));
    let mut surface = HeadlessSurface::new();
    page.create_contents(&mut surface);
    (page, surface)
}

#[test]
fn test_commit_persists_to_disk() {
    let dir = TestStoreDir::new();
    dir.write_store("ui", "[editor]\ntab_width = 2\n");
    let (registry, _) = dir.registry(&["ui", "core"]);
    let (mut page, surface) = editor_page(registry);
    assert_eq!(surface.control("editor.tab_width").unwrap().value(), "2");

    surface.control("editor.tab_width").unwrap().commit("8");
    surface.control("formatter.style").unwrap().commit("GNU");
    page.perform_ok().unwrap();

    let reopened = dir.open("ui");
    assert_eq!(reopened.read(TAB_WIDTH.name()).as_deref(), Some("8"));
    assert!(dir.read_store("core").contains("GNU"));
}

#[test]
fn test_flush_failure_keeps_edits_for_retry() {
    let ui = Rc::new(FailingStore::new("ui"));
    let core = Rc::new(MemoryStore::new("core"));
    let (mut page, surface) = editor_page(StoreRegistry::new().with(ui.clone()).with(core));

    surface.control("editor.tab_width").unwrap().commit("6");
    let err = page.perform_ok().unwrap_err();

    assert!(matches!(&err, Error::Persistence { store, .. } if store.as_str() == "ui"));
    assert_eq!(page.state(), PageState::ControlsCreated);
    assert_eq!(page.overlay().unwrap().get_int(&TAB_WIDTH), 6);

    ui.set_failing(false);
    page.perform_ok().unwrap();
    assert_eq!(ui.attempts(), 2);
    assert_eq!(ui.value(TAB_WIDTH.name()), "6");
}

#[test]
fn test_flush_attempts_every_store() {
    let ui = Rc::new(FailingStore::new("ui"));
    let core = Rc::new(RecordingStore::new("core"));
    let (mut page, _surface) = editor_page(StoreRegistry::new().with(ui).with(core.clone()));

    assert!(page.perform_apply().is_err());
    assert_eq!(core.flushes(), 1);
}

#[test]
fn test_defaults_are_visible_when_blocks_refresh() {
    let ui = Rc::new(MemoryStore::new("ui"));
    ui.write(TAB_WIDTH.name(), "12");
    let core = Rc::new(MemoryStore::new("core"));
    let overlay_store = StoreRegistry::new().with(ui.clone()).with(core);
    let (mut page, _surface) = editor_page(overlay_store);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let overlay = page.overlay().unwrap().clone();
    let sink = Rc::clone(&seen);
    let reader = overlay.clone();
    overlay.add_property_change_listener(move |change| {
        if change.key == TAB_WIDTH {
            sink.borrow_mut().push(reader.get_int(&TAB_WIDTH));
        }
    });

    page.perform_defaults().unwrap();

    assert_eq!(*seen.borrow(), vec![4]);
    assert_eq!(ui.value(TAB_WIDTH.name()), "12");
}

#[test]
fn test_apply_keeps_page_open() {
    let ui = Rc::new(MemoryStore::new("ui"));
    let core = Rc::new(MemoryStore::new("core"));
    let (mut page, surface) = editor_page(StoreRegistry::new().with(ui.clone()).with(core));

    surface.control("editor.folding").unwrap().commit("false");
    page.perform_apply().unwrap();
    assert_eq!(ui.value(FOLDING.name()), "false");
    assert_eq!(page.state(), PageState::ControlsCreated);

    surface.control("editor.folding").unwrap().commit("true");
    page.perform_ok().unwrap();
    assert_eq!(ui.read(FOLDING.name()), None);
}

#[test]
fn test_dispose_twice_stops_overlay_once() {
    let ui = Rc::new(RecordingStore::new("ui"));
    let core = Rc::new(RecordingStore::new("core"));
    let (mut page, _surface) = editor_page(StoreRegistry::new().with(ui.clone()).with(core.clone()));
    assert_eq!(ui.active_subscriptions(), 1);

    page.dispose();
    page.dispose();
    drop(page);

    assert_eq!(ui.unsubscribes(), 1);
    assert_eq!(core.unsubscribes(), 1);
    assert_eq!(ui.active_subscriptions(), 0);
}

#[test]
fn test_dispose_reaches_every_block_despite_failures() {
    let ui = Rc::new(MemoryStore::new("ui"));
    let overlay = OverlayStore::new(StoreRegistry::new().with(ui), []);
    let released = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&released);
    let failing = OptionsBlock::builder("Colors", &overlay)
        .checkbox(FOLDING, "Enable folding")
        .on_dispose(|| Err("already released".to_string()))
        .build();
    let fine = OptionsBlock::builder("Hovers", &overlay)
        .number(TAB_WIDTH, "Tab width", 1, 16)
        .on_dispose(move || {
            log.borrow_mut().push("Hovers");
            Ok(())
        })
        .build();
    let mut page = PreferencePage::new("Editor", overlay);
    page.add_block(Rc::new(failing));
    page.add_block(Rc::new(fine));

    page.dispose();

    assert_eq!(*released.borrow(), vec!["Hovers"]);
    assert!(page.blocks().iter().all(|block| block.state() == BlockState::Disposed));
}

#[test]
fn test_project_settings_shadow_workspace() {
    let workspace = Rc::new(MemoryStore::new("ui-workspace"));
    workspace.write(TAB_WIDTH.name(), "2");
    let project = Rc::new(MemoryStore::new("ui-project"));
    let ui = Rc::new(ScopedStore::new("ui", project.clone(), workspace.clone()));
    let core = Rc::new(MemoryStore::new("core"));
    let (mut page, surface) = editor_page(StoreRegistry::new().with(ui).with(core));
    assert_eq!(surface.control("editor.tab_width").unwrap().value(), "2");

    surface.control("editor.tab_width").unwrap().commit("3");
    page.perform_ok().unwrap();

    assert_eq!(project.value(TAB_WIDTH.name()), "3");
    assert_eq!(workspace.value(TAB_WIDTH.name()), "2");
}

#[test]
fn test_project_keeps_default_over_workspace_value() {
    let workspace = Rc::new(MemoryStore::new("ui-workspace"));
    workspace.write(TAB_WIDTH.name(), "2");
    let project = Rc::new(MemoryStore::new("ui-project"));
    project.write(TAB_WIDTH.name(), "3");
    let ui = Rc::new(ScopedStore::new("ui", project.clone(), workspace.clone()));
    let core = Rc::new(MemoryStore::new("core"));
    let (mut page, surface) = editor_page(StoreRegistry::new().with(ui.clone()).with(core));

    surface.control("editor.tab_width").unwrap().commit("4");
    page.perform_ok().unwrap();

    assert_eq!(project.read(TAB_WIDTH.name()).as_deref(), Some("4"));
    assert_eq!(ui.value(TAB_WIDTH.name()), "4");
    assert_eq!(workspace.value(TAB_WIDTH.name()), "2");
}

#[test]
fn test_project_value_matching_workspace_is_cleared() {
    let workspace = Rc::new(MemoryStore::new("ui-workspace"));
    workspace.write(TAB_WIDTH.name(), "2");
    let project = Rc::new(MemoryStore::new("ui-project"));
    project.write(TAB_WIDTH.name(), "3");
    let ui = Rc::new(ScopedStore::new("ui", project.clone(), workspace.clone()));
    let core = Rc::new(MemoryStore::new("core"));
    let (mut page, surface) = editor_page(StoreRegistry::new().with(ui.clone()).with(core));

    surface.control("editor.tab_width").unwrap().commit("2");
    page.perform_ok().unwrap();

    assert_eq!(project.read(TAB_WIDTH.name()), None);
    assert_eq!(ui.value(TAB_WIDTH.name()), "2");
}

#[test]
fn test_operations_after_cancel_are_rejected() {
    let ui = Rc::new(MemoryStore::new("ui"));
    let core = Rc::new(MemoryStore::new("core"));
    let (mut page, _surface) = editor_page(StoreRegistry::new().with(ui).with(core));
    page.perform_cancel();

    assert!(matches!(page.perform_defaults(), Err(Error::PageNotOpen { .. })));
    assert!(matches!(page.perform_revert(), Err(Error::PageNotOpen { .. })));
}
