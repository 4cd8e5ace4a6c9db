//! Error types for dualview-config.

/// Result type alias for dualview-config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration source could not be found, read or parsed.
    ///
    /// Fatal when raised by the first load, logged and recovered afterwards.
    #[error("Cannot load config source `{locator}`: {reason}")]
    SourceUnavailable {
        /// Locator of the source (usually a file path)
        locator: String,
        /// Why the source could not be loaded
        reason: String,
    },

    /// A snapshot accessor was used before the first successful reload.
    #[error("Config not loaded")]
    NotLoaded,

    /// A subscription was registered without a handler.
    #[error("Subscription handler is missing or not callable")]
    InvalidHandler,

    /// File watching failed to initialize.
    #[error("File watching error: {0}")]
    WatchError(String),

    /// Configuration source does not support watching.
    #[error("Configuration source does not support watching")]
    WatchNotSupported,

    /// Periodic reload was requested outside of a tokio runtime.
    #[error("Periodic reload requires a running tokio runtime")]
    RuntimeUnavailable,

    /// Attempted to use a feature that is not enabled.
    #[error("Feature not enabled: {0}")]
    FeatureNotEnabled(&'static str),

    /// Failed to deserialize a snapshot into a typed value.
    #[error("Failed to deserialize configuration: {0}")]
    DeserializationError(String),

    /// A reload lifecycle hook failed.
    #[error("Reload hook failed: {0}")]
    Hook(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error for other cases.
    #[error("Configuration error: {0}")]
    Other(String),
}

impl ConfigError {
    /// Build a [`ConfigError::SourceUnavailable`] for the given locator.
    pub fn source_unavailable(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error means the source could not be loaded.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }
}
