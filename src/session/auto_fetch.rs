//! session::auto_fetch
//!
//! Background fetch timer.
//!
//! At most one timer runs per scheduler. Starting stops the previous timer
//! and stores the new one under a single lock, so concurrent starts never
//! stack.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::core::config::{GitSettings, DEFAULT_REMOTE};

use super::GitSession;

/// Owns the repeating timer task.
#[derive(Debug, Default)]
pub struct AutoFetchScheduler {
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl AutoFetchScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Restart the timer from `settings`, calling `tick` every period.
    ///
    /// Disabled auto-fetch leaves no timer running. The first tick fires
    /// one full period after the call. Must be called inside a tokio runtime
    /// when enabled.
    pub fn start<F, Fut>(&self, settings: &GitSettings, tick: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut timer = self.lock();
        if let Some(previous) = timer.take() {
            previous.abort();
            tracing::debug!("auto-fetch stopped");
        }
        if !settings.auto_fetch {
            return;
        }

        let period = settings.auto_fetch_period();
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        *timer = Some(tokio::spawn(async move {
            loop {
                interval.tick().await;
                tick().await;
            }
        }));
        tracing::debug!(period_ms = period.as_millis() as u64, "auto-fetch started");
    }

    /// Cancel the timer. Safe when none is running.
    pub fn stop(&self) {
        if let Some(handle) = self.lock().take() {
            handle.abort();
            tracing::debug!("auto-fetch stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl GitSession {
    /// Start periodic background fetches from `origin`.
    ///
    /// Ticks are skipped while no repository is detected or another
    /// operation runs. Fetch failures are discarded.
    pub fn start_auto_fetch(self: &Arc<Self>) {
        let session = Arc::downgrade(self);
        let settings = self.state.git_settings();
        self.auto_fetch.start(&settings, move || {
            let session = session.clone();
            async move {
                let Some(session) = session.upgrade() else {
                    return;
                };
                if !session.state.is_repo_initialized()
                    || session.state.is_git_operation_in_progress()
                {
                    return;
                }
                if let Err(e) = session.try_fetch(DEFAULT_REMOTE).await {
                    tracing::debug!(error = %e, "background fetch failed");
                }
            }
        });
    }

    pub fn stop_auto_fetch(&self) {
        self.auto_fetch.stop();
    }

    pub fn is_auto_fetch_running(&self) -> bool {
        self.auto_fetch.is_running()
    }
}
