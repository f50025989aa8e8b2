//! Error types for pref-cli

/// Result type for prefs commands
pub type Result<T> = std::result::Result<T, CliError>;

/// Why a prefs command failed
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Store, schema or page lifecycle failure
    #[error(transparent)]
    Core(#[from] pref_core::Error),

    /// Could not render `show --json`
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Key not declared in the schema
    #[error("Unknown preference key '{key}'")]
    UnknownKey { key: String },

    /// The page status is an error, so nothing was committed
    #[error("{message}")]
    Rejected { message: String },

    /// Bad arguments or an unusable location
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    pub fn rejected(status: &pref_core::Status) -> Self {
        Self::Rejected {
            message: status.message().to_string(),
        }
    }
}
