//! Options accepted by [`ConfigManager::setup`](crate::core::ConfigManager::setup).

use crate::core::ConfigMap;
use crate::error::Result;
use crate::sources::{ConfigSource, FileSource};
use config::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle hook run at the beginning or end of every reload.
///
/// An error returned by a hook aborts the reload and is returned to whoever
/// triggered it.
pub type ReloadHook = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Whether the source is watched when nothing else was requested.
pub(crate) const DEFAULT_WATCH_SOURCE: bool = cfg!(feature = "file-watch");

/// A partial set of manager options.
///
/// Every option left unset keeps its current value when passed to
/// [`ConfigManager::setup`](crate::core::ConfigManager::setup). Setting an
/// option replaces the stored value as a whole (including `defaults`).
///
/// # Examples
///
/// ```rust
/// use dualview_config::prelude::*;
/// use std::time::Duration;
///
/// let options = SetupOptions::new()
///     .file("config/app.yaml")
///     .watch_source(false)
///     .autoreload(Duration::from_secs(30))
///     .default_value("workers", 4i64)
///     .on_reload_end(|| {
///         println!("reloaded");
///         Ok(())
///     });
/// ```
#[derive(Clone, Default)]
pub struct SetupOptions {
    pub(crate) source: Option<Arc<dyn ConfigSource>>,
    pub(crate) autoreload: Option<Duration>,
    pub(crate) watch_source: Option<bool>,
    pub(crate) on_reload_begin: Option<ReloadHook>,
    pub(crate) on_reload_end: Option<ReloadHook>,
    pub(crate) defaults: Option<ConfigMap>,
}

impl SetupOptions {
    /// An empty set of options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a YAML, TOML or JSON file.
    pub fn file(self, path: impl Into<PathBuf>) -> Self {
        self.source(FileSource::new(path))
    }

    /// Load configuration from a custom source.
    pub fn source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Reload periodically. `Duration::ZERO` disables the periodic reload.
    pub fn autoreload(mut self, interval: Duration) -> Self {
        self.autoreload = Some(interval);
        self
    }

    /// Reload whenever the source file changes on disk.
    pub fn watch_source(mut self, watch: bool) -> Self {
        self.watch_source = Some(watch);
        self
    }

    /// Hook run before every reload.
    pub fn on_reload_begin<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.on_reload_begin = Some(Arc::new(hook));
        self
    }

    /// Hook run after every reload.
    pub fn on_reload_end<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.on_reload_end = Some(Arc::new(hook));
        self
    }

    /// Replace the default values.
    pub fn defaults<I, K, V>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.defaults = Some(
            defaults
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Add a single default value.
    pub fn default_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults
            .get_or_insert_with(ConfigMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Whether these options touch the file watch.
    pub(crate) fn touches_watch(&self) -> bool {
        self.source.is_some() || self.watch_source.is_some()
    }
}

impl fmt::Debug for SetupOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupOptions")
            .field("source", &self.source.as_ref().map(|s| s.locator()))
            .field("autoreload", &self.autoreload)
            .field("watch_source", &self.watch_source)
            .field("on_reload_begin", &self.on_reload_begin.is_some())
            .field("on_reload_end", &self.on_reload_end.is_some())
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// Options currently in effect.
#[derive(Clone)]
pub(crate) struct ManagerOptions {
    pub(crate) source: Option<Arc<dyn ConfigSource>>,
    pub(crate) autoreload: Duration,
    pub(crate) watch_source: bool,
    pub(crate) on_reload_begin: Option<ReloadHook>,
    pub(crate) on_reload_end: Option<ReloadHook>,
    pub(crate) defaults: ConfigMap,
}

impl ManagerOptions {
    /// Shallow merge: every option present in `patch` replaces the stored one.
    pub(crate) fn apply(&mut self, patch: &SetupOptions) {
        if let Some(source) = &patch.source {
            self.source = Some(Arc::clone(source));
        }
        if let Some(interval) = patch.autoreload {
            self.autoreload = interval;
        }
        if let Some(watch) = patch.watch_source {
            self.watch_source = watch;
        }
        if let Some(hook) = &patch.on_reload_begin {
            self.on_reload_begin = Some(Arc::clone(hook));
        }
        if let Some(hook) = &patch.on_reload_end {
            self.on_reload_end = Some(Arc::clone(hook));
        }
        if let Some(defaults) = &patch.defaults {
            self.defaults = defaults.clone();
        }
    }
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            source: None,
            autoreload: Duration::ZERO,
            watch_source: DEFAULT_WATCH_SOURCE,
            on_reload_begin: None,
            on_reload_end: None,
            defaults: ConfigMap::new(),
        }
    }
}
