//! Periodic `POST /start` while the engine is believed to be running.
//!
//! The timer is owned by a single [`KeepAlive`] value: arming replaces any
//! previous task, and disarming or dropping the owner aborts it.

use quantbot_engine_client::EngineApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Default)]
pub struct KeepAlive {
    task: Option<JoinHandle<()>>,
}

impl KeepAlive {
    #[must_use]
    pub const fn new() -> Self {
        Self { task: None }
    }

    /// Starts pinging every `period`, first ping one period from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&mut self, api: Arc<dyn EngineApi>, period: Duration) {
        self.disarm();
        tracing::info!(period_secs = period.as_secs(), "Keep-alive armed");
        self.task = Some(tokio::spawn(run(api, period)));
    }

    /// Cancels the timer. Returns true if one was armed.
    pub fn disarm(&mut self) -> bool {
        match self.task.take() {
            Some(handle) => {
                handle.abort();
                tracing::info!("Keep-alive disarmed");
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }
}

async fn run(api: Arc<dyn EngineApi>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        // No acknowledgement or backoff: the next tick simply tries again.
        match api.start().await {
            Ok(reply) => tracing::debug!(reply = %reply.message, "Keep-alive ping sent"),
            Err(e) => tracing::warn!(error = %e, "Keep-alive ping failed"),
        }
    }
}
