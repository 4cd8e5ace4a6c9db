//! Core configuration management types.

mod manager;
mod options;
pub(crate) mod snapshot;

pub use manager::ConfigManager;
pub use options::{ReloadHook, SetupOptions};
pub use snapshot::{ConfigMap, SharedConfig, coerce_to_string, coerced_eq};
