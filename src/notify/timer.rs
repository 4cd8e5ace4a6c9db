//! Periodic reload trigger.

use crate::error::{ConfigError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{self, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

/// Runs a callback at a fixed interval on the current tokio runtime.
///
/// The first tick happens one full period after creation. Ticks that were missed
/// because a callback ran long are delayed rather than bursted. Each tick runs
/// on the blocking pool, so a callback doing file I/O or waiting for another
/// reload never stalls a runtime worker. The timer is cancelled when
/// [`cancel`](ReloadTimer::cancel) is called or when it is dropped.
pub(crate) struct ReloadTimer {
    task: JoinHandle<()>,
    period: Duration,
}

impl ReloadTimer {
    /// Start a timer calling `on_tick` every `period`, which must be non-zero.
    ///
    /// The callback returns `false` to stop the timer from the inside.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RuntimeUnavailable`] when called outside a tokio
    /// runtime.
    pub(crate) fn start<F>(period: Duration, on_tick: F) -> Result<Self>
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| ConfigError::RuntimeUnavailable)?;
        let on_tick = Arc::new(on_tick);

        let task = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let tick = Arc::clone(&on_tick);
                match task::spawn_blocking(move || tick()).await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!("Reload timer stopped by its callback");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Reload timer tick failed");
                        break;
                    }
                }
            }
        });

        Ok(Self { task, period })
    }

    /// The tick period.
    pub(crate) fn period(&self) -> Duration {
        self.period
    }

    /// Stop the timer. A tick already running completes.
    pub(crate) fn cancel(self) {
        drop(self);
    }
}

impl Drop for ReloadTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
