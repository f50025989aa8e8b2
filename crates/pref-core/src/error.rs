//! Error types for pref-core

use crate::key::StoreId;

/// Result type for pref-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pref-core operations
///
/// Malformed stored values never show up here: they fall back to the
/// type's zero value. Validation problems are reported as
/// [`Status`](crate::Status), not as errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A backing store could not be written to durable storage
    #[error("Preference store '{store}' could not be saved: {message}")]
    Persistence { store: StoreId, message: String },

    /// A settings block refused to commit
    #[error("Settings block '{block}' rejected the commit: {reason}")]
    BlockRejected { block: String, reason: String },

    /// The page's aggregated status forbids committing
    #[error("Cannot commit while the page reports an error: {message}")]
    InvalidStatus { message: String },

    /// A page operation was requested outside the open state
    #[error("Preference page '{page}' is not open ({state})")]
    PageNotOpen { page: String, state: String },

    /// A block failed to release its resources
    #[error("Settings block '{block}' failed to dispose: {message}")]
    Dispose { block: String, message: String },

    /// The key schema is invalid
    #[error("Invalid preference schema: {message}")]
    Schema { message: String },

    /// Filesystem error from pref-fs
    #[error(transparent)]
    Fs(#[from] pref_fs::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }
}
