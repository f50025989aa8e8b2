//! Typed preference keys

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Identifier of the logical store a key lives in (e.g. `"ui"`, `"core"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(Cow<'static, str>);

impl StoreId {
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for StoreId {
    fn from(id: &'static str) -> Self {
        Self::from_static(id)
    }
}

impl From<String> for StoreId {
    fn from(id: String) -> Self {
        Self(Cow::Owned(id))
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of value types a key may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Int,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Int => write!(f, "int"),
            Self::String => write!(f, "string"),
        }
    }
}

/// A preference key: name, declared type and owning store.
///
/// Equality and hashing use `(name, store)` only; the value type is a tag.
///
/// ```
/// use pref_core::TypedKey;
///
/// const TAB_WIDTH: TypedKey = TypedKey::int("ui", "editor.tab_width");
/// assert_eq!(TAB_WIDTH.name(), "editor.tab_width");
/// ```
#[derive(Debug, Clone)]
pub struct TypedKey {
    name: Cow<'static, str>,
    value_type: ValueType,
    store: StoreId,
}

impl TypedKey {
    pub const fn boolean(store: &'static str, name: &'static str) -> Self {
        Self::from_static(store, name, ValueType::Boolean)
    }

    pub const fn int(store: &'static str, name: &'static str) -> Self {
        Self::from_static(store, name, ValueType::Int)
    }

    pub const fn string(store: &'static str, name: &'static str) -> Self {
        Self::from_static(store, name, ValueType::String)
    }

    const fn from_static(store: &'static str, name: &'static str, value_type: ValueType) -> Self {
        Self {
            name: Cow::Borrowed(name),
            value_type,
            store: StoreId::from_static(store),
        }
    }

    /// Build a key at runtime, e.g. from a schema file.
    pub fn new(store: impl Into<StoreId>, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            value_type,
            store: store.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn store(&self) -> &StoreId {
        &self.store
    }

    /// Zero value of the declared type, as text.
    pub fn zero_text(&self) -> &'static str {
        match self.value_type {
            ValueType::Boolean => "false",
            ValueType::Int => "0",
            ValueType::String => "",
        }
    }

    /// Whether `text` parses as this key's declared type.
    pub fn accepts(&self, text: &str) -> bool {
        match self.value_type {
            ValueType::Boolean => parse_bool(text).is_some(),
            ValueType::Int => parse_int(text).is_some(),
            ValueType::String => true,
        }
    }
}

impl PartialEq for TypedKey {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.store == other.store
    }
}

impl Eq for TypedKey {}

impl Hash for TypedKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.store.hash(state);
    }
}

impl fmt::Display for TypedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.store, self.name)
    }
}

/// A typed value accepted by overlay setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefValue {
    Boolean(bool),
    Int(i32),
    String(String),
}

impl PrefValue {
    /// Serialize to the text form held by stores.
    pub fn to_text(&self) -> String {
        match self {
            Self::Boolean(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::String(s) => s.clone(),
        }
    }
}

impl From<bool> for PrefValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for PrefValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for PrefValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PrefValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Parse boolean text; only `true`/`false` (any case) are accepted.
pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

pub(crate) fn parse_int(text: &str) -> Option<i32> {
    text.trim().parse().ok()
}
