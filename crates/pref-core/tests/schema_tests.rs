use std::fs;
use std::rc::Rc;

use pref_core::{
    Error, HeadlessSurface, KeySchema, OverlayStore, PreferencePage, PreferenceStore, Severity,
    SettingsBlock, ValueType,
};
use pref_test_utils::dir::TestStoreDir;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const SCHEMA: &str = r#"
[[key]]
name = "editor.tab_width"
type = "int"
store = "ui"
default = 4
label = "Tab width"
tab = "Editor"
min = 1
max = 16

[[key]]
name = "editor.folding"
type = "boolean"
store = "ui"
default = true
tab = "Editor"

[[key]]
name = "build.output_dir"
type = "string"
store = "build"
default = "target"
label = "Output directory"
tab = "Build"
required = true
"#;

#[test]
fn test_load_schema_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("prefs.schema.toml");
    fs::write(&path, SCHEMA).unwrap();

    let schema = KeySchema::load(&path).unwrap();

    assert_eq!(schema.keys().len(), 3);
    assert_eq!(schema.keys()[0].value_type, ValueType::Int);
    assert_eq!(schema.tabs(), vec!["Editor", "Build"]);
}

#[test]
fn test_missing_schema_file_is_an_fs_error() {
    let temp = TempDir::new().unwrap();
    let err = KeySchema::load(&temp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Fs(_)));
}

#[test]
fn test_schema_drives_a_page_end_to_end() {
    let schema = KeySchema::parse(SCHEMA).unwrap();
    let dir = TestStoreDir::new();
    let (registry, stores) = dir.registry(&["ui", "build"]);
    schema.register_defaults(&registry).unwrap();

    let overlay = OverlayStore::new(registry, []);
    let block = schema.build_block(&overlay, "Preferences");
    let mut page = PreferencePage::new("Preferences", overlay);
    page.add_block(Rc::new(block));
    let mut surface = HeadlessSurface::new();
    page.create_contents(&mut surface);

    let output_dir = surface.control("build.output_dir").unwrap();
    output_dir.commit("");
    assert_eq!(page.status().severity(), Severity::Error);
    assert!(page.perform_ok().is_err());

    output_dir.commit("out");
    surface.control("editor.tab_width").unwrap().commit("2");
    page.perform_ok().unwrap();

    assert_eq!(stores[1].value("build.output_dir"), "out");
    assert!(dir.read_store("ui").contains("tab_width"));
    assert!(page.blocks().iter().all(|block| block.status().is_ok()));
}
