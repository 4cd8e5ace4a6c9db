//! # dualview-config
//!
//! File-backed runtime configuration with a frozen static view, a live dynamic
//! view and keyed change subscriptions.
//!
//! ## Overview
//!
//! A [`ConfigManager`](core::ConfigManager) loads a YAML, TOML or JSON file into a
//! flat key/value map and keeps two snapshots of it:
//! - the **static** configuration, captured by the first successful load and
//!   never replaced, for settings that only apply at startup
//! - the **dynamic** configuration, replaced by every reload
//!
//! Reloads are triggered explicitly, by a periodic timer, or by changes to the
//! source file. Subscribers are notified on every reload, or only when one of the
//! keys they watch changes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dualview_config::prelude::*;
//!
//! # fn example() -> Result<()> {
//! let manager = ConfigManager::new();
//! manager.setup(
//!     SetupOptions::new()
//!         .file("config/app.yaml")
//!         .default_value("log_level", "info"),
//! )?;
//!
//! manager.subscribe_with(
//!     SubscribeOptions::new()
//!         .watch(WatchKeys::keys(["log_level"]))
//!         .handler(|new, _old| println!("log level: {:?}", new.get("log_level"))),
//! )?;
//!
//! let port = manager.s()?.get("port");
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `file-watch` (default): reload when the source file changes
//! - `autoreload` (default): periodic reload on a tokio runtime

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{ConfigManager, ConfigMap, SetupOptions, SharedConfig};
    pub use crate::error::{ConfigError, Result};
    pub use crate::notify::{SubscribeOptions, WatchKeys};
}
