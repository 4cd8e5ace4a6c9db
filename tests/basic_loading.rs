//! Integration tests for loading, snapshots and defaults.

use dualview_config::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct ServerConfig {
    port: u16,
    host: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct AppConfig {
    server: ServerConfig,
    workers: u32,
}

fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn manager_for(path: &Path) -> ConfigManager {
    let manager = ConfigManager::new();
    manager
        .setup(SetupOptions::new().file(path).watch_source(false))
        .unwrap();
    manager
}

fn int(config: &SharedConfig, key: &str) -> i64 {
    config.get(key).unwrap().into_int().unwrap()
}

#[test]
fn test_load_single_yaml_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(
        &temp_dir,
        "config.yaml",
        r#"
server:
  port: 8080
  host: localhost
workers: 4
"#,
    );

    let manager = manager_for(&config_path);
    assert!(manager.loaded());

    let cfg: AppConfig = manager.d().unwrap().deserialize().unwrap();
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.server.host, "localhost");
    assert_eq!(cfg.workers, 4);
}

#[test]
fn test_load_toml_and_json_files() {
    let temp_dir = TempDir::new().unwrap();
    let toml_path = write_config(&temp_dir, "config.toml", "a = 1\nb = \"two\"\n");
    let json_path = write_config(&temp_dir, "config.json", r#"{"a": 1, "b": "two"}"#);

    for path in [toml_path, json_path] {
        let dynamic = manager_for(&path).d().unwrap();
        assert_eq!(int(&dynamic, "a"), 1);
        assert_eq!(dynamic.get("b").unwrap().into_string().unwrap(), "two");
    }
}

#[test]
fn test_defaults_precedence() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "config.json", r#"{"a": 1, "b": 2}"#);

    let manager = ConfigManager::new();
    manager
        .setup(
            SetupOptions::new()
                .file(&config_path)
                .watch_source(false)
                .defaults([("b", 20i64), ("c", 3i64)]),
        )
        .unwrap();

    for snapshot in [manager.d().unwrap(), manager.s().unwrap()] {
        assert_eq!(snapshot.len(), 3);
        assert_eq!(int(&snapshot, "a"), 1);
        assert_eq!(int(&snapshot, "b"), 2);
        assert_eq!(int(&snapshot, "c"), 3);
    }
}

#[test]
fn test_reload_unchanged_source_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "config.json", r#"{"a": 1, "b": "x"}"#);
    let manager = manager_for(&config_path);

    let first_dynamic = manager.d().unwrap().to_map();
    let first_static = manager.s().unwrap().to_map();

    manager.reload().unwrap();

    let render = |map: &ConfigMap| {
        let mut entries: Vec<_> = map
            .iter()
            .map(|(k, v)| format!("{}={}", k, dualview_config::core::coerce_to_string(v)))
            .collect();
        entries.sort();
        entries
    };
    assert_eq!(render(&manager.d().unwrap().to_map()), render(&first_dynamic));
    assert_eq!(render(&manager.s().unwrap().to_map()), render(&first_static));
}

#[test]
fn test_static_snapshot_is_frozen() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "config.json", r#"{"a": 1}"#);
    let manager = manager_for(&config_path);

    fs::write(&config_path, r#"{"a": 2, "extra": true}"#).unwrap();
    manager.reload().unwrap();
    fs::write(&config_path, r#"{"a": 3}"#).unwrap();
    manager.reload().unwrap();

    let static_config = manager.s().unwrap();
    assert_eq!(int(&static_config, "a"), 1);
    assert!(!static_config.contains_key("extra"));
    assert_eq!(int(&manager.d().unwrap(), "a"), 3);
}

#[test]
fn test_dynamic_snapshot_drops_removed_keys() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "config.json", r#"{"a": 1, "b": 2}"#);
    let manager = manager_for(&config_path);

    fs::write(&config_path, r#"{"a": 1}"#).unwrap();
    manager.reload().unwrap();

    assert!(!manager.d().unwrap().contains_key("b"));
    assert!(manager.s().unwrap().contains_key("b"));
}

#[test]
fn test_not_loaded_guard() {
    let manager = ConfigManager::new();
    assert!(matches!(manager.dynamic_config(), Err(ConfigError::NotLoaded)));
    assert!(matches!(manager.static_config(), Err(ConfigError::NotLoaded)));

    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "config.json", r#"{"a": 1}"#);
    manager
        .setup(SetupOptions::new().file(&config_path).watch_source(false))
        .unwrap();
    assert!(manager.dynamic_config().is_ok());
    assert!(manager.static_config().is_ok());
}

#[test]
fn test_fatal_first_failure() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.yaml");

    let manager = ConfigManager::new();
    let result = manager.setup(SetupOptions::new().file(&missing).watch_source(false));

    assert!(matches!(result, Err(ConfigError::SourceUnavailable { .. })));
    assert!(!manager.loaded());
    assert!(manager.d().is_err());
}

#[test]
fn test_later_failure_keeps_snapshots() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "config.json", r#"{"a": 1}"#);
    let manager = manager_for(&config_path);

    fs::remove_file(&config_path).unwrap();
    manager.reload().unwrap();
    assert_eq!(int(&manager.d().unwrap(), "a"), 1);

    fs::write(&config_path, "{ broken").unwrap();
    manager.reload().unwrap();
    assert_eq!(int(&manager.d().unwrap(), "a"), 1);

    fs::write(&config_path, r#"{"a": 5}"#).unwrap();
    manager.reload().unwrap();
    assert_eq!(int(&manager.d().unwrap(), "a"), 5);
}

#[test]
fn test_shared_handles_alias_manager_state() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "config.json", r#"{"a": 1}"#);
    let manager = manager_for(&config_path);

    let handle = manager.d().unwrap();
    fs::write(&config_path, r#"{"a": 2}"#).unwrap();
    manager.reload().unwrap();
    assert_eq!(int(&handle, "a"), 2);

    handle.write().insert("local".to_string(), 9i64.into());
    assert_eq!(int(&manager.d().unwrap(), "local"), 9);
}

#[test]
fn test_clone_handle_shares_state() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "config.json", r#"{"a": 1}"#);
    let manager = manager_for(&config_path);
    let clone = manager.clone();

    fs::write(&config_path, r#"{"a": 2}"#).unwrap();
    clone.reload().unwrap();

    assert_eq!(int(&manager.d().unwrap(), "a"), 2);
    assert_eq!(manager.to_string(), config_path.display().to_string());
}

#[test]
fn test_setup_without_reload() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "config.json", r#"{"a": 1}"#);

    let manager = ConfigManager::new();
    manager
        .setup_with_reload(SetupOptions::new().file(&config_path).watch_source(false), false)
        .unwrap();
    assert!(!manager.loaded());

    manager.reload().unwrap();
    assert!(manager.loaded());
}

#[test]
fn test_setup_can_switch_source() {
    let temp_dir = TempDir::new().unwrap();
    let first = write_config(&temp_dir, "first.json", r#"{"a": 1}"#);
    let second = write_config(&temp_dir, "second.json", r#"{"a": 2}"#);

    let manager = manager_for(&first);
    manager.setup(SetupOptions::new().file(&second)).unwrap();

    assert_eq!(int(&manager.d().unwrap(), "a"), 2);
    assert_eq!(int(&manager.s().unwrap(), "a"), 1);
    assert_eq!(manager.to_string(), second.display().to_string());
}

#[test]
fn test_keys_keep_their_case() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(
        &temp_dir,
        "config.yaml",
        "Port: 1\nhostName: x\nServer:\n  maxConns: 4\n",
    );

    let manager = ConfigManager::new();
    manager
        .setup(
            SetupOptions::new()
                .file(&config_path)
                .watch_source(false)
                .default_value("logLevel", "info"),
        )
        .unwrap();

    let dynamic = manager.d().unwrap();
    let mut keys: Vec<_> = dynamic.to_map().into_keys().collect();
    keys.sort();
    assert_eq!(keys, ["Port", "Server", "hostName", "logLevel"]);
    assert_eq!(int(&dynamic, "Port"), 1);
    assert!(dynamic.get("port").is_none());
    assert_eq!(dynamic.get("hostName").unwrap().into_string().unwrap(), "x");

    let server = dynamic.get("Server").unwrap().into_table().unwrap();
    assert!(server.contains_key("maxConns"));
    assert!(manager.s().unwrap().contains_key("hostName"));
}

#[test]
fn test_mixed_case_watched_key_notifies() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, "config.json", r#"{"Port": 1}"#);
    let manager = manager_for(&config_path);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    manager
        .subscribe_with(
            SubscribeOptions::new()
                .init_call(false)
                .watch(WatchKeys::keys(["Port"]))
                .handler(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
        )
        .unwrap();

    fs::write(&config_path, r#"{"Port": 2}"#).unwrap();
    manager.reload().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
