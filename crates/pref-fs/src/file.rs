//! Format-agnostic preference files
//!
//! A preference file is a flat map from preference name to its text value.
//! Nested tables in a hand-written file are flattened into dotted names and
//! scalar values are converted to text, so `[editor]\ntab_width = 4` and
//! `"editor.tab_width" = "4"` load identically.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::{Error, Result, io};

/// Flat `name -> text` preference map, ordered by name.
pub type PreferenceMap = BTreeMap<String, String>;

/// Serialization format of a preference file, detected from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Json,
    Yaml,
}

impl FileFormat {
    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat { extension }),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

/// A preference file on disk.
#[derive(Debug, Clone)]
pub struct PreferenceFile {
    path: PathBuf,
    format: FileFormat,
}

impl PreferenceFile {
    /// Create a handle for `path`; fails if the extension is not supported.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = FileFormat::from_path(&path)?;
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load the preference map. A missing file is an empty map.
    pub fn load(&self) -> Result<PreferenceMap> {
        let Some(content) = io::read_text_if_exists(&self.path)? else {
            tracing::debug!(path = ?self.path, "No preference file yet");
            return Ok(PreferenceMap::new());
        };
        if content.trim().is_empty() {
            return Ok(PreferenceMap::new());
        }

        let parsed: Value = match self.format {
            FileFormat::Toml => toml::from_str(&content).map_err(|e| self.parse_error(e))?,
            FileFormat::Json => serde_json::from_str(&content).map_err(|e| self.parse_error(e))?,
            FileFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| self.parse_error(e))?,
        };

        let mut map = PreferenceMap::new();
        match parsed {
            Value::Object(_) => flatten_into(&mut map, None, parsed),
            Value::Null => {}
            _ => {
                return Err(Error::ConfigParse {
                    path: self.path.clone(),
                    format: self.format.label().into(),
                    message: "top level must be a table of preferences".into(),
                });
            }
        }
        Ok(map)
    }

    /// Save the preference map atomically.
    pub fn save(&self, map: &PreferenceMap) -> Result<()> {
        let content = match self.format {
            FileFormat::Toml => toml::to_string_pretty(map).map_err(|e| self.serialize_error(e))?,
            FileFormat::Json => {
                serde_json::to_string_pretty(map).map_err(|e| self.serialize_error(e))?
            }
            FileFormat::Yaml => serde_yaml::to_string(map).map_err(|e| self.serialize_error(e))?,
        };
        io::write_text(&self.path, &content)
    }

    fn parse_error(&self, e: impl std::fmt::Display) -> Error {
        Error::ConfigParse {
            path: self.path.clone(),
            format: self.format.label().into(),
            message: e.to_string(),
        }
    }

    fn serialize_error(&self, e: impl std::fmt::Display) -> Error {
        Error::ConfigSerialize {
            path: self.path.clone(),
            format: self.format.label().into(),
            message: e.to_string(),
        }
    }
}

fn flatten_into(map: &mut PreferenceMap, prefix: Option<&str>, value: Value) {
    let join = |name: &str| match prefix {
        Some(p) => format!("{}.{}", p, name),
        None => name.to_string(),
    };
    match value {
        Value::Object(entries) => {
            for (name, child) in entries {
                let full = join(&name);
                flatten_into(map, Some(&full), child);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            if let Some(name) = prefix {
                map.insert(name.to_string(), s);
            }
        }
        Value::Bool(_) | Value::Number(_) | Value::Array(_) => {
            if let Some(name) = prefix {
                map.insert(name.to_string(), value.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("prefs.toml", FileFormat::Toml)]
    #[case("prefs.JSON", FileFormat::Json)]
    #[case("prefs.yml", FileFormat::Yaml)]
    #[case("prefs.yaml", FileFormat::Yaml)]
    fn detects_format_from_extension(#[case] name: &str, #[case] expected: FileFormat) {
        assert_eq!(FileFormat::from_path(Path::new(name)).unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = PreferenceFile::new("prefs.ini").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn missing_file_loads_empty() {
        let temp = TempDir::new().unwrap();
        let file = PreferenceFile::new(temp.path().join("ui.toml")).unwrap();
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn nested_tables_flatten_to_dotted_names() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ui.toml");
        std::fs::write(
            &path,
            "\"editor.folding\" = \"true\"\n\n[editor]\ntab_width = 4\nsmart_home = false\n",
        )
        .unwrap();

        let map = PreferenceFile::new(&path).unwrap().load().unwrap();
        assert_eq!(map.get("editor.tab_width").map(String::as_str), Some("4"));
        assert_eq!(map.get("editor.smart_home").map(String::as_str), Some("false"));
        assert_eq!(map.get("editor.folding").map(String::as_str), Some("true"));
    }

    #[test]
    fn saved_toml_reloads_identically() {
        let temp = TempDir::new().unwrap();
        let file = PreferenceFile::new(temp.path().join("nested/core.toml")).unwrap();

        let mut map = PreferenceMap::new();
        map.insert("indexer.strategy".into(), "fast".into());
        map.insert("indexer.max_files".into(), "2000".into());
        file.save(&map).unwrap();

        assert_eq!(file.load().unwrap(), map);
    }
}
