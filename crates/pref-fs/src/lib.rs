//! Preference file I/O
//!
//! Provides atomic writes and a format-agnostic codec for flat preference
//! files (`name -> text` maps) stored as TOML, JSON or YAML.

pub mod error;
pub mod file;
pub mod io;

pub use error::{Error, Result};
pub use file::{PreferenceFile, PreferenceMap};
