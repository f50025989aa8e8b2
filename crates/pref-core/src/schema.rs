//! Key declarations loaded from TOML
//!
//! A schema lists every preference key a page edits, with its type, store,
//! default and presentation hints:
//!
//! ```toml
//! [[key]]
//! name = "editor.tab_width"
//! type = "int"
//! store = "ui"
//! default = 4
//! label = "Tab width"
//! tab = "Editor"
//! min = 1
//! max = 16
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::block::{BlockHandle, OptionsBlock, TabConfigurationBlock};
use crate::key::{StoreId, TypedKey, ValueType};
use crate::overlay::OverlayStore;
use crate::store::StoreRegistry;
use crate::{Error, Result};

const DEFAULT_TAB: &str = "General";

/// One declared preference key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyDecl {
    pub name: String,

    #[serde(rename = "type")]
    pub value_type: ValueType,

    pub store: String,

    /// Registered default; the type's zero value when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<toml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Tab the key is shown on; `"General"` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i32>,

    /// Closed set of values for a string key (shown as a combo)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,

    /// A string key that must not be empty
    #[serde(default)]
    pub required: bool,

    /// Boolean key that enables this one, as `name` or `store:name`.
    ///
    /// A bare name resolves within this key's store first, then to the
    /// only other store declaring it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_by: Option<String>,
}

impl KeyDecl {
    pub fn key(&self) -> TypedKey {
        TypedKey::new(self.store.clone(), self.name.clone(), self.value_type)
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn tab(&self) -> &str {
        self.tab.as_deref().unwrap_or(DEFAULT_TAB)
    }

    /// Default as stored text.
    pub fn default_text(&self) -> String {
        match &self.default {
            Some(toml::Value::String(text)) => text.clone(),
            Some(value) => value.to_string(),
            None => self.key().zero_text().to_string(),
        }
    }
}

/// A validated list of key declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeySchema {
    #[serde(rename = "key", default)]
    keys: Vec<KeyDecl>,
}

impl KeySchema {
    /// Parse and validate a schema from TOML content.
    ///
    /// ```
    /// use pref_core::KeySchema;
    ///
    /// let schema = KeySchema::parse(r#"
    /// [[key]]
    /// name = "editor.folding"
    /// type = "boolean"
    /// store = "ui"
    /// default = true
    /// "#).unwrap();
    ///
    /// assert_eq!(schema.keys()[0].default_text(), "true");
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let schema: KeySchema = toml::from_str(content)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Read and parse a schema file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = pref_fs::io::read_text(path)?;
        let schema = Self::parse(&content)?;
        tracing::debug!(path = ?path, keys = schema.keys.len(), "Loaded key schema");
        Ok(schema)
    }

    pub fn keys(&self) -> &[KeyDecl] {
        &self.keys
    }

    pub fn find(&self, name: &str) -> Option<&KeyDecl> {
        self.keys.iter().find(|decl| decl.name == name)
    }

    pub fn find_in(&self, store: &str, name: &str) -> Option<&KeyDecl> {
        self.keys
            .iter()
            .find(|decl| decl.store == store && decl.name == name)
    }

    /// The declaration named by `decl.enabled_by`, if it resolves.
    pub fn master_of(&self, decl: &KeyDecl) -> Option<&KeyDecl> {
        let reference = decl.enabled_by.as_deref()?;
        if let Some((store, name)) = reference.split_once(':') {
            return self.find_in(store, name);
        }
        if let Some(master) = self.find_in(&decl.store, reference) {
            return Some(master);
        }
        let mut others = self.keys.iter().filter(|other| other.name == reference);
        match (others.next(), others.next()) {
            (Some(master), None) => Some(master),
            _ => None,
        }
    }

    /// Distinct stores in declaration order.
    pub fn store_ids(&self) -> Vec<StoreId> {
        let mut ids: Vec<StoreId> = Vec::new();
        for decl in &self.keys {
            let id = StoreId::from(decl.store.clone());
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Tab names in first-appearance order.
    pub fn tabs(&self) -> Vec<&str> {
        let mut tabs: Vec<&str> = Vec::new();
        for decl in &self.keys {
            if !tabs.contains(&decl.tab()) {
                tabs.push(decl.tab());
            }
        }
        tabs
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for decl in &self.keys {
            if !seen.insert((decl.store.as_str(), decl.name.as_str())) {
                return Err(Error::schema(format!(
                    "key '{}' is declared twice in store '{}'",
                    decl.name, decl.store
                )));
            }

            let default = decl.default_text();
            if !decl.key().accepts(&default) {
                return Err(Error::schema(format!(
                    "default '{}' of key '{}' is not a valid {}",
                    default, decl.name, decl.value_type
                )));
            }

            if let (Some(min), Some(max)) = (decl.min, decl.max) {
                if min > max {
                    return Err(Error::schema(format!(
                        "key '{}' has min {} greater than max {}",
                        decl.name, min, max
                    )));
                }
            }
            if decl.value_type == ValueType::Int && decl.default.is_some() {
                let value: i32 = default.trim().parse().unwrap_or_default();
                let below = decl.min.is_some_and(|min| value < min);
                let above = decl.max.is_some_and(|max| value > max);
                if below || above {
                    return Err(Error::schema(format!(
                        "default {} of key '{}' is out of range",
                        value, decl.name
                    )));
                }
            }

            if !decl.choices.is_empty() {
                if decl.value_type != ValueType::String {
                    return Err(Error::schema(format!(
                        "key '{}' has choices but is not a string key",
                        decl.name
                    )));
                }
                if !decl.choices.contains(&default) {
                    return Err(Error::schema(format!(
                        "default '{}' of key '{}' is not one of its choices",
                        default, decl.name
                    )));
                }
            }

            if let Some(master) = &decl.enabled_by {
                let is_boolean = self
                    .master_of(decl)
                    .is_some_and(|decl| decl.value_type == ValueType::Boolean);
                if !is_boolean {
                    return Err(Error::schema(format!(
                        "key '{}' is enabled by '{}', which is not a declared boolean key",
                        decl.name, master
                    )));
                }
            }
        }
        Ok(())
    }

    /// Register every declared default with its store.
    pub fn register_defaults(&self, stores: &StoreRegistry) -> Result<()> {
        for decl in &self.keys {
            let key = decl.key();
            let store = stores.get(key.store()).ok_or_else(|| {
                Error::schema(format!(
                    "key '{}' refers to unknown store '{}'",
                    decl.name, decl.store
                ))
            })?;
            store.set_default(key.name(), &decl.default_text());
        }
        Ok(())
    }

    /// Build one [`OptionsBlock`] per tab, wrapped in a tab container.
    pub fn build_block(&self, overlay: &OverlayStore, name: &str) -> TabConfigurationBlock {
        let children: Vec<BlockHandle> = self
            .tabs()
            .into_iter()
            .map(|tab| {
                let mut builder = OptionsBlock::builder(tab, overlay);
                for decl in self.keys.iter().filter(|decl| decl.tab() == tab) {
                    let key = decl.key();
                    builder = match decl.value_type {
                        ValueType::Boolean => builder.checkbox(key.clone(), decl.label()),
                        ValueType::Int => builder.number(
                            key.clone(),
                            decl.label(),
                            decl.min.unwrap_or(i32::MIN),
                            decl.max.unwrap_or(i32::MAX),
                        ),
                        ValueType::String if !decl.choices.is_empty() => {
                            builder.combo(key.clone(), decl.label(), decl.choices.iter().cloned())
                        }
                        ValueType::String if decl.required => {
                            builder.required_text(key.clone(), decl.label())
                        }
                        ValueType::String => builder.text(key.clone(), decl.label()),
                    };
                    if let Some(master) = self.master_of(decl) {
                        builder = builder.dependency(master.key(), [key]);
                    }
                }
                Rc::new(builder.build()) as BlockHandle
            })
            .collect();
        TabConfigurationBlock::new(name, children)
    }
}
