//! Configuration source trait.

use crate::core::ConfigMap;
use crate::error::Result;
use std::path::Path;

/// Trait for configuration sources.
///
/// A source turns a locator into a flat key/value mapping. Implementations must
/// not cache: every call to [`load`](ConfigSource::load) has to reflect the
/// current state of the underlying storage, so that a reload after an edit
/// observes the edit.
pub trait ConfigSource: Send + Sync {
    /// Read the source as a key/value map.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SourceUnavailable`](crate::error::ConfigError::SourceUnavailable)
    /// if the source cannot be found, read or parsed.
    fn load(&self) -> Result<ConfigMap>;

    /// Human-readable locator of this source (for logging and `Display`).
    fn locator(&self) -> String;

    /// Filesystem path to watch for changes, if the source has one.
    fn watch_path(&self) -> Option<&Path> {
        None
    }
}
