//! Configuration snapshots and value comparison.

use crate::error::{ConfigError, Result};
use config::{Value, ValueKind};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A flat mapping from top-level configuration key to value.
pub type ConfigMap = HashMap<String, Value>;

/// A shared, mutable configuration snapshot.
///
/// Cloning a `SharedConfig` clones the handle, not the map: every clone (and the
/// manager that owns the snapshot) observes the same storage. Writes made through
/// [`write`](SharedConfig::write) are visible to the manager, and reloads are
/// visible to every handle.
///
/// # Examples
///
/// ```rust
/// use dualview_config::core::SharedConfig;
///
/// let snapshot = SharedConfig::default();
/// let alias = snapshot.clone();
/// snapshot.write().insert("port".into(), 8080i64.into());
/// assert!(alias.contains_key("port"));
/// ```
#[derive(Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<ConfigMap>>,
}

impl SharedConfig {
    /// Create a snapshot holding `values`.
    pub fn new(values: ConfigMap) -> Self {
        Self {
            inner: Arc::new(RwLock::new(values)),
        }
    }

    /// Lock the snapshot for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, ConfigMap> {
        self.inner.read()
    }

    /// Lock the snapshot for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, ConfigMap> {
        self.inner.write()
    }

    /// Get a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the snapshot has no keys.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Copy the current contents out of the snapshot.
    pub fn to_map(&self) -> ConfigMap {
        self.inner.read().clone()
    }

    /// Deserialize the whole snapshot into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DeserializationError`] if the snapshot does not
    /// match the shape of `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dualview_config::core::SharedConfig;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Server {
    ///     port: u16,
    /// }
    ///
    /// let snapshot = SharedConfig::default();
    /// snapshot.write().insert("port".into(), 8080i64.into());
    /// let server: Server = snapshot.deserialize().unwrap();
    /// assert_eq!(server.port, 8080);
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        let table: config::Map<String, Value> = self
            .inner
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Value::new(None, ValueKind::Table(table))
            .try_deserialize::<T>()
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }

    /// Replace the whole content with `values`, keeping the same storage.
    pub(crate) fn replace(&self, values: &ConfigMap) {
        let mut map = self.inner.write();
        map.clear();
        map.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Overlay `values` on top of the current content.
    pub(crate) fn overlay(&self, values: &ConfigMap) {
        self.inner
            .write()
            .extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Insert every default whose key is not present yet.
    pub(crate) fn seed_defaults(&self, defaults: &ConfigMap) {
        let mut map = self.inner.write();
        for (key, value) in defaults {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

impl fmt::Debug for SharedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.read().iter()).finish()
    }
}

/// Overlay `loaded` on `defaults`; loaded values win.
pub(crate) fn merge_defaults(defaults: &ConfigMap, loaded: ConfigMap) -> ConfigMap {
    let mut merged = defaults.clone();
    merged.extend(loaded);
    merged
}

/// Render a value the way it compares under string-coerced equality.
///
/// Numbers render as decimal text (so `1`, `1.0` and `"1"` all render `1`),
/// arrays as their comma-joined elements, and tables with their keys sorted.
///
/// Floats use Rust's `Display`, which never switches to exponent notation:
/// `1e21` renders `1000000000000000000000` and `1e-7` renders `0.0000001`.
/// A float therefore does not equal a string spelling the same number in
/// exponent form, such as `"1e21"`.
pub fn coerce_to_string(value: &Value) -> String {
    match &value.kind {
        ValueKind::Nil => "null".to_string(),
        ValueKind::Boolean(b) => b.to_string(),
        ValueKind::I64(n) => n.to_string(),
        ValueKind::Float(f) if f.is_nan() => "NaN".to_string(),
        ValueKind::Float(f) if f.is_infinite() => {
            let sign = if *f > 0.0 { "" } else { "-" };
            format!("{}Infinity", sign)
        }
        ValueKind::Float(f) => f.to_string(),
        ValueKind::String(s) => s.clone(),
        ValueKind::Array(items) => items
            .iter()
            .map(coerce_to_string)
            .collect::<Vec<_>>()
            .join(","),
        ValueKind::Table(table) => {
            let mut entries: Vec<_> = table
                .iter()
                .map(|(k, v)| format!("{}={}", k, coerce_to_string(v)))
                .collect();
            entries.sort();
            format!("{{{}}}", entries.join(","))
        }
        other => other.to_string(),
    }
}

/// Compare two optional values under string-coerced equality.
///
/// An absent value only equals another absent value.
pub fn coerced_eq(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => coerce_to_string(a) == coerce_to_string(b),
        _ => false,
    }
}

/// Whether any of `keys` differs between `old` and `new`.
pub(crate) fn any_changed<'a>(
    keys: impl IntoIterator<Item = &'a String>,
    old: &ConfigMap,
    new: &ConfigMap,
) -> bool {
    keys.into_iter()
        .any(|key| !coerced_eq(old.get(key), new.get(key)))
}
