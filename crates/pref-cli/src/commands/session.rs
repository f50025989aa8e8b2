//! Store wiring shared by all commands

use std::path::{Path, PathBuf};
use std::rc::Rc;

use pref_core::{
    FileStore, HeadlessSurface, KeyDecl, KeySchema, OverlayStore, PreferencePage,
    PreferenceStore, ScopedStore, StoreHandle, StoreRegistry,
};

use crate::error::{CliError, Result};

const APP_DIR: &str = "prefkit";
const PAGE_TITLE: &str = "Preferences";

/// Where the schema and the store files live.
#[derive(Debug, Clone)]
pub struct Locations {
    pub schema: PathBuf,
    pub dir: Option<PathBuf>,
    pub project: Option<PathBuf>,
}

impl Locations {
    /// Workspace store directory: `--dir`, else `<config_dir>/prefkit`.
    fn workspace_dir(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or_else(|| CliError::user("Cannot determine the config directory; pass --dir")),
        }
    }
}

/// A loaded schema with one opened store per schema store id.
pub struct Session {
    schema: KeySchema,
    stores: StoreRegistry,
}

impl Session {
    pub fn open(locations: &Locations) -> Result<Self> {
        if !locations.schema.exists() {
            return Err(CliError::user(format!(
                "Schema file not found: {}",
                locations.schema.display()
            )));
        }
        let schema = KeySchema::load(&locations.schema)?;
        let workspace_dir = locations.workspace_dir()?;

        let mut stores = StoreRegistry::new();
        for id in schema.store_ids() {
            let workspace = FileStore::open(id.clone(), store_path(&workspace_dir, id.as_str()))?;
            let store: StoreHandle = match &locations.project {
                Some(project_dir) => {
                    let project = FileStore::open(id.clone(), store_path(project_dir, id.as_str()))?;
                    Rc::new(ScopedStore::new(id, Rc::new(project), Rc::new(workspace)))
                }
                None => Rc::new(workspace),
            };
            stores.register(store);
        }
        schema.register_defaults(&stores)?;

        tracing::debug!(
            stores = stores.len(),
            keys = schema.keys().len(),
            dir = ?workspace_dir,
            "Opened preference session"
        );
        Ok(Self { schema, stores })
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    /// Look up a declared key by `name` or `store:name`.
    pub fn decl(&self, name: &str) -> Result<&KeyDecl> {
        let found = match name.split_once(':') {
            Some((store, key)) => self.schema.find_in(store, key),
            None => self.schema.find(name),
        };
        found.ok_or_else(|| CliError::UnknownKey {
            key: name.to_string(),
        })
    }

    fn store(&self, decl: &KeyDecl) -> Result<&StoreHandle> {
        let key = decl.key();
        self.stores.get(key.store()).ok_or_else(|| {
            CliError::user(format!("No store '{}' for key '{}'", decl.store, decl.name))
        })
    }

    /// Effective stored text of `decl`, and whether it is explicitly set.
    pub fn stored(&self, decl: &KeyDecl) -> Result<(String, bool)> {
        let store = self.store(decl)?;
        Ok((store.value(&decl.name), store.contains(&decl.name)))
    }

    /// Open a page over every declared key with headless controls.
    pub fn page(&self) -> (PreferencePage, HeadlessSurface) {
        let overlay = OverlayStore::new(self.stores.clone(), []);
        let block = self.schema.build_block(&overlay, PAGE_TITLE);
        let mut page = PreferencePage::new(PAGE_TITLE, overlay);
        page.add_block(Rc::new(block));
        let mut surface = HeadlessSurface::new();
        page.create_contents(&mut surface);
        (page, surface)
    }
}

fn store_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{id}.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SCHEMA: &str = r#"
[[key]]
name = "editor.tab_width"
type = "int"
store = "ui"
default = 4
min = 1
max = 16
"#;

    fn locations(temp: &TempDir, project: bool) -> Locations {
        let schema = temp.path().join("prefs.schema.toml");
        fs::write(&schema, SCHEMA).unwrap();
        Locations {
            schema,
            dir: Some(temp.path().join("workspace")),
            project: project.then(|| temp.path().join("project")),
        }
    }

    #[test]
    fn missing_schema_is_a_user_error() {
        let temp = TempDir::new().unwrap();
        let err = Session::open(&Locations {
            schema: temp.path().join("absent.toml"),
            dir: Some(temp.path().to_path_buf()),
            project: None,
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("Schema file not found"));
    }

    #[test]
    fn stored_falls_back_to_schema_default() {
        let temp = TempDir::new().unwrap();
        let session = Session::open(&locations(&temp, false)).unwrap();
        let decl = session.decl("editor.tab_width").unwrap();
        assert_eq!(session.stored(decl).unwrap(), ("4".to_string(), false));
    }

    #[test]
    fn project_store_shadows_workspace() {
        let temp = TempDir::new().unwrap();
        let locations = locations(&temp, true);
        fs::create_dir_all(temp.path().join("workspace")).unwrap();
        fs::create_dir_all(temp.path().join("project")).unwrap();
        fs::write(temp.path().join("workspace/ui.toml"), "[editor]\ntab_width = 2\n").unwrap();
        fs::write(temp.path().join("project/ui.toml"), "[editor]\ntab_width = 3\n").unwrap();

        let session = Session::open(&locations).unwrap();
        let decl = session.decl("editor.tab_width").unwrap();
        assert_eq!(session.stored(decl).unwrap(), ("3".to_string(), true));
    }

    #[test]
    fn unknown_key_is_a_user_error() {
        let temp = TempDir::new().unwrap();
        let session = Session::open(&locations(&temp, false)).unwrap();
        assert!(matches!(session.decl("nope"), Err(CliError::User { .. })));
    }
}
