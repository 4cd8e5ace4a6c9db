//! Subscriber-based notifications for configuration changes.

use crate::core::ConfigMap;
use crate::core::snapshot::any_changed;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with `(new_config, old_config)`.
///
/// `old_config` is `None` for the initial call made while subscribing.
pub type Handler = Arc<dyn Fn(&ConfigMap, Option<&ConfigMap>) + Send + Sync>;

/// Which keys a subscription is interested in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WatchKeys {
    /// Fire on every reload, whether or not anything changed.
    #[default]
    All,
    /// Fire only when at least one of these keys changed.
    Keys(BTreeSet<String>),
}

impl WatchKeys {
    /// Watch the given keys.
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }

    /// Whether a reload from `old` to `new` concerns this filter.
    pub fn matches(&self, old: &ConfigMap, new: &ConfigMap) -> bool {
        match self {
            Self::All => true,
            Self::Keys(keys) => any_changed(keys, old, new),
        }
    }
}

/// Options for registering a subscription.
///
/// # Examples
///
/// ```rust
/// use dualview_config::notify::{SubscribeOptions, WatchKeys};
///
/// let options = SubscribeOptions::new()
///     .id("pool-resizer")
///     .watch(WatchKeys::keys(["pool_size"]))
///     .init_call(false)
///     .handler(|new, _old| println!("pool_size is now {:?}", new.get("pool_size")));
/// ```
#[derive(Clone)]
pub struct SubscribeOptions {
    pub(crate) handler: Option<Handler>,
    pub(crate) id: Option<String>,
    pub(crate) init_call: bool,
    pub(crate) watch: WatchKeys,
}

impl SubscribeOptions {
    /// Options with the defaults: random id, initial call, watch everything.
    pub fn new() -> Self {
        Self {
            handler: None,
            id: None,
            init_call: true,
            watch: WatchKeys::All,
        }
    }

    /// Set the handler.
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ConfigMap, Option<&ConfigMap>) + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Use an explicit id instead of a random one.
    ///
    /// Registering an id that is already in use replaces that subscription.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Whether the handler is called once while subscribing (default `true`).
    pub fn init_call(mut self, init_call: bool) -> Self {
        self.init_call = init_call;
        self
    }

    /// Restrict notifications to changes of specific keys.
    pub fn watch(mut self, watch: WatchKeys) -> Self {
        self.watch = watch;
        self
    }
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscribeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeOptions")
            .field("has_handler", &self.handler.is_some())
            .field("id", &self.id)
            .field("init_call", &self.init_call)
            .field("watch", &self.watch)
            .finish()
    }
}

struct Subscription {
    handler: Handler,
    watch: WatchKeys,
}

/// Ordered registry of subscriptions keyed by id.
///
/// Handlers are returned in registration order. Replacing an id keeps its
/// original position.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<Vec<(String, Subscription)>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `id`, replacing any subscription with that id.
    pub fn insert(&self, id: String, handler: Handler, watch: WatchKeys) {
        let record = Subscription { handler, watch };
        let mut subscribers = self.subscribers.lock();
        match subscribers.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => slot.1 = record,
            None => subscribers.push((id, record)),
        }
    }

    /// Remove the subscription with `id`. Returns whether one was removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| existing != id);
        subscribers.len() != before
    }

    /// Handlers whose filter matches a change from `old` to `new`, in order.
    ///
    /// The registry lock is released before the caller invokes them, so
    /// handlers may subscribe or unsubscribe freely.
    pub fn matching(&self, old: &ConfigMap, new: &ConfigMap) -> Vec<Handler> {
        self.subscribers
            .lock()
            .iter()
            .filter(|(_, sub)| sub.watch.matches(old, new))
            .map(|(_, sub)| Arc::clone(&sub.handler))
            .collect()
    }

    /// Whether a subscription with `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.subscribers.lock().iter().any(|(existing, _)| existing == id)
    }

    /// Ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.subscribers
            .lock()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Get the number of active subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Whether there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

/// Generate a random subscription id: 12 random bytes, hex encoded.
pub fn generate_id() -> String {
    (0..12).map(|_| format!("{:02x}", fastrand::u8(..))).collect()
}
