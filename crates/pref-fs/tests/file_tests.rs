use pref_fs::{Error, PreferenceFile, PreferenceMap};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

fn sample_map() -> PreferenceMap {
    let mut map = PreferenceMap::new();
    map.insert("editor.tab_width".into(), "8".into());
    map.insert("editor.folding".into(), "true".into());
    map.insert("includes.header_rules".into(), "[]".into());
    map
}

#[rstest]
#[case("prefs.toml")]
#[case("prefs.json")]
#[case("prefs.yaml")]
fn test_save_then_load_preserves_values(#[case] name: &str) {
    let temp = TempDir::new().unwrap();
    let file = PreferenceFile::new(temp.path().join(name)).unwrap();

    file.save(&sample_map()).unwrap();

    assert_eq!(file.load().unwrap(), sample_map());
}

#[test]
fn test_load_json_scalars_become_text() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("core.json");
    fs::write(&path, r#"{"indexer": {"enabled": true, "limit": 25}, "style": "K&R"}"#).unwrap();

    let map = PreferenceFile::new(&path).unwrap().load().unwrap();

    assert_eq!(map["indexer.enabled"], "true");
    assert_eq!(map["indexer.limit"], "25");
    assert_eq!(map["style"], "K&R");
}

#[test]
fn test_load_yaml_nested() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ui.yml");
    fs::write(&path, "editor:\n  tab_width: 2\n").unwrap();

    let map = PreferenceFile::new(&path).unwrap().load().unwrap();

    assert_eq!(map["editor.tab_width"], "2");
}

#[test]
fn test_load_malformed_toml_reports_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ui.toml");
    fs::write(&path, "this is = = not toml").unwrap();

    let err = PreferenceFile::new(&path).unwrap().load().unwrap_err();

    match err {
        Error::ConfigParse { path: reported, format, .. } => {
            assert_eq!(reported, path);
            assert_eq!(format, "TOML");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_load_json_array_root_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ui.json");
    fs::write(&path, "[1, 2, 3]").unwrap();

    let result = PreferenceFile::new(&path).unwrap().load();

    assert!(matches!(result, Err(Error::ConfigParse { .. })));
}

#[test]
fn test_empty_file_loads_empty_map() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ui.toml");
    fs::write(&path, "\n").unwrap();

    let map = PreferenceFile::new(&path).unwrap().load().unwrap();

    assert!(map.is_empty());
}
