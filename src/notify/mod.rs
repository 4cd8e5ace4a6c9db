//! Configuration change notification system.
//!
//! Provides keyed subscriptions and the two reload triggers: a file watch and a
//! periodic timer.

pub mod subscriber;

#[cfg(feature = "autoreload")]
pub(crate) mod timer;

#[cfg(feature = "file-watch")]
pub mod watcher;

pub use subscriber::{Handler, SubscribeOptions, SubscriberRegistry, WatchKeys};

#[cfg(feature = "autoreload")]
pub(crate) use timer::ReloadTimer;

#[cfg(feature = "file-watch")]
pub use watcher::{DEFAULT_SETTLE_DELAY, SourceWatcher};
