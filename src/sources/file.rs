//! File-based configuration source.

use super::ConfigSource;
use crate::core::ConfigMap;
use crate::error::{ConfigError, Result};
use config::{File, Source};
use std::path::{Path, PathBuf};

/// File-based configuration source.
///
/// Loads configuration from YAML, TOML, or JSON files with automatic format detection
/// based on file extension. The file is parsed from disk on every load, and keys
/// keep the case they have in the file.
///
/// # Examples
///
/// ```rust,no_run
/// use dualview_config::sources::{ConfigSource, FileSource};
///
/// let source = FileSource::new("config/app.yaml");
/// let values = source.load()?;
/// # Ok::<(), dualview_config::error::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a new file source with automatic format detection.
    ///
    /// The format is detected from the file extension:
    /// - `.yaml`, `.yml` -> YAML
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, reason: impl ToString) -> ConfigError {
        ConfigError::source_unavailable(self.locator(), reason)
    }

    /// Validate that the file extension is supported.
    fn validate_extension(&self) -> Result<()> {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| self.unavailable("unable to determine file format"))?;

        match extension {
            "yaml" | "yml" | "toml" | "json" => Ok(()),
            _ => Err(self.unavailable(format!(
                "unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
                extension
            ))),
        }
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<ConfigMap> {
        self.validate_extension()?;

        if !self.path.is_file() {
            return Err(self.unavailable("file not found"));
        }

        // Collect the parsed file directly: `config::Config` lowercases keys.
        File::from(self.path.clone())
            .required(true)
            .collect()
            .map_err(|e| self.unavailable(e))
    }

    fn locator(&self) -> String {
        self.path.display().to_string()
    }

    fn watch_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
