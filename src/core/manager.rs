//! The configuration manager: snapshots, reloads and subscriptions.

use crate::core::options::{ManagerOptions, SetupOptions};
use crate::core::snapshot::{ConfigMap, SharedConfig, merge_defaults};
use crate::error::{ConfigError, Result};
use crate::notify::subscriber::{SubscribeOptions, SubscriberRegistry, generate_id};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[cfg(feature = "autoreload")]
use crate::notify::ReloadTimer;

#[cfg(feature = "file-watch")]
use crate::notify::SourceWatcher;

/// Runtime configuration manager with a static and a dynamic view.
///
/// The *static* configuration is captured by the first successful reload and
/// never replaced afterwards. The *dynamic* configuration is replaced by every
/// successful reload. Subscribers are told about reloads, optionally only when
/// specific keys change.
///
/// `ConfigManager` is a cheap handle: clones share the same snapshots,
/// subscriptions and triggers. Create one at startup and pass clones around.
///
/// # Examples
///
/// ```rust,no_run
/// use dualview_config::prelude::*;
///
/// # fn example() -> Result<()> {
/// let manager = ConfigManager::new();
/// manager.setup(
///     SetupOptions::new()
///         .file("config/app.yaml")
///         .default_value("workers", 4i64),
/// )?;
///
/// manager.subscribe_with(
///     SubscribeOptions::new()
///         .watch(WatchKeys::keys(["workers"]))
///         .init_call(false)
///         .handler(|new, _old| println!("workers: {:?}", new.get("workers"))),
/// )?;
///
/// let workers = manager.d()?.get("workers");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct ConfigManager {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    options: RwLock<ManagerOptions>,
    initialized: AtomicBool,
    static_config: SharedConfig,
    dynamic_config: SharedConfig,
    subscribers: SubscriberRegistry,
    triggers: Mutex<Triggers>,
    /// Serializes reloads and is held across hooks and handlers. Re-entrant,
    /// so a hook or handler may reload inline on its own thread.
    reload_lock: ReentrantMutex<()>,
}

#[derive(Default)]
struct Triggers {
    #[cfg(feature = "autoreload")]
    timer: Option<ReloadTimer>,
    #[cfg(feature = "file-watch")]
    watcher: Option<SourceWatcher>,
}

impl ConfigManager {
    /// Create an unconfigured manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `options` and reload immediately.
    ///
    /// See [`setup_with_reload`](Self::setup_with_reload).
    ///
    /// # Errors
    ///
    /// Returns an error if a trigger cannot be started or the reload fails.
    pub fn setup(&self, options: SetupOptions) -> Result<&Self> {
        self.setup_with_reload(options, true)
    }

    /// Apply `options`, then reload if `reload_now` is set.
    ///
    /// Options are merged shallowly into the stored ones. Default keys missing
    /// from the snapshots are seeded; values already present are kept. Passing
    /// `autoreload` restarts the periodic timer, and passing `source` or
    /// `watch_source` restarts the file watch.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::RuntimeUnavailable`] if a periodic reload is requested
    ///   outside a tokio runtime
    /// - [`ConfigError::WatchError`] / [`ConfigError::WatchNotSupported`] if
    ///   the source cannot be watched
    /// - [`ConfigError::FeatureNotEnabled`] if a trigger's feature is disabled
    /// - any error from [`reload`](Self::reload)
    pub fn setup_with_reload(&self, options: SetupOptions, reload_now: bool) -> Result<&Self> {
        {
            let mut stored = self.inner.options.write();
            stored.apply(&options);
            self.inner.static_config.seed_defaults(&stored.defaults);
            self.inner.dynamic_config.seed_defaults(&stored.defaults);
        }

        if let Some(interval) = options.autoreload {
            self.restart_timer(interval)?;
        }
        if options.touches_watch() {
            self.restart_watch()?;
        }

        if reload_now {
            self.reload()?;
        }
        Ok(self)
    }

    /// Stop the file watch and the periodic timer.
    ///
    /// Snapshots and subscriptions are kept. Calling `stop` twice is harmless.
    pub fn stop(&self) {
        self.inner.triggers.lock().stop_all();
        debug!("Configuration triggers stopped");
    }

    /// Re-read the source and notify subscribers.
    ///
    /// The dynamic snapshot is replaced by the defaults overlaid with the
    /// freshly read source. The first successful reload also fills the static
    /// snapshot. Subscribers watching everything are always called; others only
    /// when one of their keys changed under string-coerced equality.
    ///
    /// If the source cannot be read after a previous successful load, the error
    /// is logged, both snapshots are kept and no subscriber is called.
    ///
    /// Reloads are serialized, and hooks and handlers run inside that critical
    /// section. They may call `reload` themselves, but must not block on a
    /// reload running on another thread.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::SourceUnavailable`] if the source cannot be read and
    ///   nothing was loaded before
    /// - any error returned by a reload hook
    pub fn reload(&self) -> Result<()> {
        self.inner.reload()
    }

    /// Subscribe `handler` to every reload.
    ///
    /// The handler gets a random id, is called once right away with
    /// `(current_dynamic_config, None)`, and then on every reload with
    /// `(new_config, Some(old_config))`. Returns the id.
    ///
    /// # Errors
    ///
    /// Never fails for a plain handler; the `Result` mirrors
    /// [`subscribe_with`](Self::subscribe_with).
    pub fn subscribe<F>(&self, handler: F) -> Result<String>
    where
        F: Fn(&ConfigMap, Option<&ConfigMap>) + Send + Sync + 'static,
    {
        self.subscribe_with(SubscribeOptions::new().handler(handler))
    }

    /// Register a subscription described by `options`. Returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHandler`] if no handler was set.
    pub fn subscribe_with(&self, options: SubscribeOptions) -> Result<String> {
        let handler = options.handler.ok_or(ConfigError::InvalidHandler)?;
        let subscribers = &self.inner.subscribers;
        let id = options.id.unwrap_or_else(|| loop {
            let candidate = generate_id();
            if !subscribers.contains(&candidate) {
                break candidate;
            }
        });

        subscribers.insert(id.clone(), Arc::clone(&handler), options.watch);
        debug!(id = %id, "Subscription registered");

        if options.init_call {
            let current = self.inner.dynamic_config.to_map();
            handler(&current, None);
        }
        Ok(id)
    }

    /// Remove the subscription with `id`, if any.
    pub fn unsubscribe(&self, id: &str) {
        if self.inner.subscribers.remove(id) {
            debug!(id = %id, "Subscription removed");
        }
    }

    /// Whether at least one reload succeeded.
    pub fn loaded(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    /// The live dynamic configuration.
    ///
    /// The returned handle shares storage with the manager: it reflects later
    /// reloads, and writes through it are seen by the manager.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotLoaded`] before the first successful reload.
    pub fn dynamic_config(&self) -> Result<SharedConfig> {
        self.ensure_loaded()?;
        Ok(self.inner.dynamic_config.clone())
    }

    /// Short for [`dynamic_config`](Self::dynamic_config).
    pub fn d(&self) -> Result<SharedConfig> {
        self.dynamic_config()
    }

    /// The static configuration captured by the first successful reload.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotLoaded`] before the first successful reload.
    pub fn static_config(&self) -> Result<SharedConfig> {
        self.ensure_loaded()?;
        Ok(self.inner.static_config.clone())
    }

    /// Short for [`static_config`](Self::static_config).
    pub fn s(&self) -> Result<SharedConfig> {
        self.static_config()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Whether the source file is being watched.
    pub fn is_watching(&self) -> bool {
        #[cfg(feature = "file-watch")]
        {
            self.inner.triggers.lock().watcher.is_some()
        }
        #[cfg(not(feature = "file-watch"))]
        {
            false
        }
    }

    /// The current periodic reload interval, if the timer is running.
    pub fn autoreload_interval(&self) -> Option<Duration> {
        #[cfg(feature = "autoreload")]
        {
            self.inner.triggers.lock().timer.as_ref().map(|t| t.period())
        }
        #[cfg(not(feature = "autoreload"))]
        {
            None
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.loaded() {
            Ok(())
        } else {
            Err(ConfigError::NotLoaded)
        }
    }

    #[cfg(feature = "autoreload")]
    fn restart_timer(&self, interval: Duration) -> Result<()> {
        let mut triggers = self.inner.triggers.lock();
        if let Some(timer) = triggers.timer.take() {
            timer.cancel();
        }
        if interval.is_zero() {
            debug!("Periodic reload disabled");
            return Ok(());
        }

        let manager = Arc::downgrade(&self.inner);
        let timer = ReloadTimer::start(interval, move || match manager.upgrade() {
            Some(inner) => {
                if let Err(e) = inner.reload() {
                    error!(error = %e, "Periodic configuration reload failed");
                }
                true
            }
            None => false,
        })?;
        triggers.timer = Some(timer);
        info!(interval = ?interval, "Periodic configuration reload started");
        Ok(())
    }

    #[cfg(not(feature = "autoreload"))]
    fn restart_timer(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            Ok(())
        } else {
            Err(ConfigError::FeatureNotEnabled("autoreload"))
        }
    }

    #[cfg(feature = "file-watch")]
    fn restart_watch(&self) -> Result<()> {
        let (watch, source) = {
            let options = self.inner.options.read();
            (options.watch_source, options.source.clone())
        };

        let mut triggers = self.inner.triggers.lock();
        if let Some(watcher) = triggers.watcher.take() {
            watcher.close();
        }
        let Some(source) = source.filter(|_| watch) else {
            return Ok(());
        };
        let path = source
            .watch_path()
            .ok_or(ConfigError::WatchNotSupported)?
            .to_path_buf();

        let manager = Arc::downgrade(&self.inner);
        let watcher = SourceWatcher::watch(&path, move || {
            if let Some(inner) = manager.upgrade() {
                if let Err(e) = inner.reload() {
                    error!(error = %e, "Configuration reload after file change failed");
                }
            }
        })?;
        info!(path = %watcher.path().display(), "Watching configuration source");
        triggers.watcher = Some(watcher);
        Ok(())
    }

    #[cfg(not(feature = "file-watch"))]
    fn restart_watch(&self) -> Result<()> {
        let options = self.inner.options.read();
        if options.watch_source && options.source.is_some() {
            Err(ConfigError::FeatureNotEnabled("file-watch"))
        } else {
            Ok(())
        }
    }
}

impl Triggers {
    fn stop_all(&mut self) {
        #[cfg(feature = "autoreload")]
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        #[cfg(feature = "file-watch")]
        if let Some(watcher) = self.watcher.take() {
            watcher.close();
        }
    }
}

impl Inner {
    fn reload(&self) -> Result<()> {
        let _serialized = self.reload_lock.lock();
        let (source, defaults, on_begin, on_end) = {
            let options = self.options.read();
            (
                options.source.clone(),
                options.defaults.clone(),
                options.on_reload_begin.clone(),
                options.on_reload_end.clone(),
            )
        };

        if let Some(hook) = &on_begin {
            hook()?;
        }

        let loaded = match &source {
            Some(source) => {
                debug!(source = %source.locator(), "Reloading configuration");
                source.load()
            }
            None => Err(ConfigError::source_unavailable(
                "",
                "no configuration source specified",
            )),
        };

        let loaded = match loaded {
            Ok(values) => values,
            Err(e) => {
                error!(error = %e, "Error while loading config source");
                if !self.initialized.load(Ordering::Acquire) {
                    return Err(e);
                }
                warn!("Keeping the previously loaded configuration");
                if let Some(hook) = &on_end {
                    hook()?;
                }
                return Ok(());
            }
        };

        let old = self.dynamic_config.to_map();
        let new = merge_defaults(&defaults, loaded);
        self.dynamic_config.replace(&new);

        if !self.initialized.load(Ordering::Acquire) {
            self.static_config.overlay(&new);
            self.initialized.store(true, Ordering::Release);
            info!(keys = new.len(), "Configuration loaded");
        }

        let handlers = self.subscribers.matching(&old, &new);
        debug!(notified = handlers.len(), "Notifying configuration subscribers");
        for handler in handlers {
            handler(&new, Some(&old));
        }

        if let Some(hook) = &on_end {
            hook()?;
        }
        Ok(())
    }
}

impl fmt::Display for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.options.read().source {
            Some(source) => f.write_str(&source.locator()),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigManager")
            .field("source", &self.to_string())
            .field("loaded", &self.loaded())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
