//! Example demonstrating file watching, periodic reload and keyed subscriptions.
//!
//! This example shows how to:
//! - Load a configuration file with defaults
//! - Reload automatically when the file changes and every 30 seconds
//! - Compare the static (startup) and dynamic (current) configuration
//! - Subscribe to changes of specific keys
//!
//! Run with: cargo run --example live_reload
//!
//! While running, try editing demos/config/live_reload.yaml to see automatic reloads.

use dualview_config::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Live Reload Example ===\n");

    let config_path = "demos/config/live_reload.yaml";
    if !std::path::Path::new(config_path).exists() {
        std::fs::create_dir_all("demos/config")?;
        std::fs::write(
            config_path,
            "port: 8080\nhost: localhost\nmax_connections: 10\n",
        )?;
        println!("Created {}", config_path);
    }

    let reload_count = Arc::new(AtomicUsize::new(0));
    let reload_count_clone = Arc::clone(&reload_count);

    let manager = ConfigManager::new();
    manager.setup(
        SetupOptions::new()
            .file(config_path)
            .watch_source(true)
            .autoreload(Duration::from_secs(30))
            .default_value("log_level", "info")
            .on_reload_end(move || {
                reload_count_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
    )?;

    println!("Configuration loaded from {}", manager);

    manager.subscribe_with(
        SubscribeOptions::new()
            .id("connections")
            .watch(WatchKeys::keys(["max_connections"]))
            .handler(|new, old| match old {
                None => println!("[Init] max_connections = {:?}", new.get("max_connections")),
                Some(old) => println!(
                    "[Event] max_connections: {:?} -> {:?}",
                    old.get("max_connections"),
                    new.get("max_connections")
                ),
            }),
    )?;

    println!(
        "\n===> Try editing {} to see automatic reloads! <===",
        config_path
    );
    println!("     Changing `port` only shows up in the dynamic view;");
    println!("     changing `max_connections` also fires the subscription.");
    println!("\nPress Ctrl+C to exit\n");

    let startup = manager.s()?;
    let current = manager.d()?;
    loop {
        tokio::time::sleep(Duration::from_secs(5)).await;

        println!(
            "[Status] reloads: {}",
            reload_count.load(Ordering::SeqCst)
        );
        println!(
            "  static port: {:?}, dynamic port: {:?}, log level: {:?}\n",
            startup.get("port"),
            current.get("port"),
            current.get("log_level")
        );
    }
}
