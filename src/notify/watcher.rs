//! File watching for automatic configuration reloads.

use crate::error::{ConfigError, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Quiet period after the last file event before the callback runs.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Watches a single configuration file and calls back on content changes.
///
/// Uses the `notify` crate. Data modifications and re-creations of the file are
/// debounced: the callback runs once, on a dedicated thread, after no event has
/// arrived for the settle delay. A plain `fs::write` truncates before writing,
/// so reacting to the first raw event could read an empty file. Metadata-only
/// events are ignored. Watching stops when the watcher is closed or dropped; a
/// burst still settling at that point is discarded.
///
/// # Examples
///
/// ```rust,no_run
/// use dualview_config::notify::SourceWatcher;
///
/// # fn example() -> dualview_config::error::Result<()> {
/// let watcher = SourceWatcher::watch("/path/to/config.yaml", || {
///     println!("Config file changed, reload triggered!");
/// })?;
///
/// // Later, stop watching
/// watcher.close();
/// # Ok(())
/// # }
/// ```
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl SourceWatcher {
    /// Start watching `path` with the [`DEFAULT_SETTLE_DELAY`].
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be resolved or the underlying file
    /// watcher cannot be created.
    pub fn watch<F>(path: impl AsRef<Path>, on_change: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        Self::watch_with_delay(path, DEFAULT_SETTLE_DELAY, on_change)
    }

    /// Start watching `path`, calling `on_change` once a burst of events has
    /// been quiet for `settle`.
    ///
    /// # Errors
    ///
    /// Same as [`watch`](Self::watch).
    pub fn watch_with_delay<F>(
        path: impl AsRef<Path>,
        settle: Duration,
        on_change: F,
    ) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let canonical_path = path.as_ref().canonicalize().map_err(|e| {
            ConfigError::WatchError(format!(
                "Failed to resolve path {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        // Raw events go to the settle thread; it exits once the sender (owned
        // by the notify watcher) is dropped.
        let (event_tx, event_rx) = mpsc::channel::<()>();
        thread::Builder::new()
            .name("config-watch".to_string())
            .spawn(move || settle_events(event_rx, settle, on_change))
            .map_err(|e| ConfigError::WatchError(format!("Failed to start watch thread: {}", e)))?;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) if is_content_change(&event.kind) => {
                    debug!(paths = ?event.paths, "Config file change detected");
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => warn!("Config watch error: {}", e),
            }
        })
        .map_err(|e| ConfigError::WatchError(format!("Failed to create file watcher: {}", e)))?;

        watcher
            .watch(&canonical_path, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::WatchError(format!("Failed to watch path: {}", e)))?;

        Ok(Self {
            _watcher: watcher,
            path: canonical_path,
        })
    }

    /// The canonical path being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop watching.
    pub fn close(self) {
        debug!(path = ?self.path, "Closing config watcher");
    }
}

/// Wait for a first event, then until `settle` passes without another one.
fn settle_events<F: Fn()>(events: mpsc::Receiver<()>, settle: Duration, on_change: F) {
    while events.recv().is_ok() {
        loop {
            match events.recv_timeout(settle) {
                Ok(()) => continue,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
        on_change();
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) | EventKind::Create(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn test_watch_nonexistent_file() {
        let result = SourceWatcher::watch("/nonexistent/config.yaml", || {});
        assert!(matches!(result, Err(ConfigError::WatchError(_))));
    }

    #[test]
    fn test_watch_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "port: 8080").unwrap();

        let watcher = SourceWatcher::watch(&config_path, || {}).unwrap();
        assert_eq!(watcher.path(), config_path.canonicalize().unwrap());
        watcher.close();
    }

    #[test]
    fn test_file_change_triggers_callback() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "port: 8080").unwrap();

        let (tx, rx) = mpsc::channel();
        let _watcher = SourceWatcher::watch(&config_path, move || {
            let _ = tx.send(());
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        fs::write(&config_path, "port: 9090").unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_burst_of_writes_calls_back_once() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "port: 0").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _watcher = SourceWatcher::watch(&config_path, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        for port in 1..=50 {
            fs::write(&config_path, format!("port: {}", port)).unwrap();
        }

        std::thread::sleep(DEFAULT_SETTLE_DELAY * 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_settle_events_stops_when_sender_dropped() {
        let (tx, rx) = mpsc::channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        tx.send(()).unwrap();
        tx.send(()).unwrap();
        drop(tx);
        settle_events(rx, Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_metadata_events_are_ignored() {
        use notify::event::{CreateKind, DataChange, MetadataKind};

        assert!(!is_content_change(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Any
        ))));
        assert!(is_content_change(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(is_content_change(&EventKind::Create(CreateKind::File)));
        assert!(!is_content_change(&EventKind::Access(
            notify::event::AccessKind::Any
        )));
    }
}
