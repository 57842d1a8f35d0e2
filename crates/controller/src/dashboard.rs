use crate::keepalive::KeepAlive;
use crate::view::{DashboardView, Notice};
use chrono::Utc;
use quantbot_core::{ConfigKey, ConfigUpdate, EngineMessage};
use quantbot_engine_client::{EngineAction, EngineApi, EngineError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

pub const FETCH_FAILED: &str = "Failed to connect to trading bot API";
pub const UPDATE_FAILED: &str = "Failed to update configuration";
pub const START_FAILED: &str = "Failed to start bot";
pub const STOP_FAILED: &str = "Failed to stop bot";

/// Shared controller behind the web pages, the TUI and the one-shot commands.
///
/// Holds the last fetched engine state and the keep-alive timer. All
/// methods take `&self` so a single instance can sit in an `Arc`.
pub struct Dashboard {
    api: Arc<dyn EngineApi>,
    view: RwLock<DashboardView>,
    keepalive: Mutex<KeepAlive>,
    keepalive_interval: Duration,
    /// Held for a whole start, stop or shutdown so their effects on the
    /// keep-alive apply in request order.
    run_control: Mutex<()>,
}

impl Dashboard {
    pub fn new(api: Arc<dyn EngineApi>, keepalive_interval: Duration) -> Self {
        Self {
            api,
            view: RwLock::new(DashboardView::default()),
            keepalive: Mutex::new(KeepAlive::new()),
            keepalive_interval,
            run_control: Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn keepalive_interval(&self) -> Duration {
        self.keepalive_interval
    }

    // ===== Reads =====

    /// Loads config, status, positions and orders concurrently.
    ///
    /// Returns true when all four reads succeeded. Fields whose read failed
    /// keep their previous value.
    pub async fn fetch_all(&self) -> bool {
        let (config, status, positions, orders) = tokio::join!(
            self.api.get_config(),
            self.api.get_status(),
            self.api.get_positions(),
            self.api.get_orders(),
        );

        let mut view = self.view.write().await;
        let mut failed = Vec::new();

        match config {
            Ok(config) => view.config = Some(config),
            Err(e) => failed.push(("config", e)),
        }
        match status {
            Ok(status) => view.status = Some(status),
            Err(e) => failed.push(("status", e)),
        }
        match positions {
            Ok(positions) => view.positions = positions,
            Err(e) => failed.push(("positions", e)),
        }
        match orders {
            Ok(orders) => view.orders = orders,
            Err(e) => failed.push(("orders", e)),
        }

        if failed.is_empty() {
            view.last_refreshed = Some(Utc::now());
            return true;
        }

        for (resource, error) in &failed {
            warn!(resource, error = %error, "Engine read failed");
        }
        view.notice = Some(Notice::error(FETCH_FAILED));
        false
    }

    /// Runs [`fetch_all`](Self::fetch_all) unless the last complete fetch is
    /// younger than `max_age`. Returns true when the view is fresh.
    pub async fn refresh_if_stale(&self, max_age: Duration) -> bool {
        let last = self.view.read().await.last_refreshed;
        let fresh = last
            .and_then(|t| (Utc::now() - t).to_std().ok())
            .is_some_and(|age| age < max_age);
        if fresh {
            return true;
        }
        self.fetch_all().await
    }

    /// Current view with the keep-alive flag filled in.
    pub async fn snapshot(&self) -> DashboardView {
        let armed = self.keepalive.lock().await.is_armed();
        let mut view = self.view.read().await.clone();
        view.keepalive_active = armed;
        view
    }

    // ===== Configuration =====

    /// Sends one `{ key, value }` update and reloads on success.
    pub async fn update_config(&self, key: ConfigKey, value: Value) -> Notice {
        let update = ConfigUpdate::new(key.as_str(), value);
        info!(key = %key, value = %update.value, "Updating engine parameter");

        let notice = match self.api.update_config(&update).await {
            Ok(()) => Notice::success(format!("{key} updated successfully")),
            Err(e) => {
                warn!(key = %key, error = %e, "Parameter update rejected");
                match e.detail() {
                    Some(detail) => Notice::error(format!("Error: {detail}")),
                    None => Notice::error(UPDATE_FAILED),
                }
            }
        };

        let succeeded = !notice.is_error();
        self.set_notice(notice.clone()).await;
        if succeeded {
            self.fetch_all().await;
        }
        notice
    }

    /// Parses raw text input for `key`, then updates it.
    ///
    /// Unknown keys and values the control would not accept produce an error
    /// notice without any request.
    pub async fn update_config_raw(&self, key: &str, raw: &str) -> Notice {
        let parsed = key
            .parse::<ConfigKey>()
            .and_then(|k| k.parse_value(raw).map(|v| (k, v)));

        match parsed {
            Ok((key, value)) => self.update_config(key, value).await,
            Err(e) => {
                warn!(key, input = raw, error = %e, "Rejected parameter input");
                let notice = Notice::error(format!("Error: {e}"));
                self.set_notice(notice.clone()).await;
                notice
            }
        }
    }

    // ===== Run control =====

    /// Starts the engine and arms the keep-alive once the engine accepts.
    pub async fn start(&self) -> Notice {
        let _guard = self.run_control.lock().await;
        self.set_loading(true).await;
        self.keepalive.lock().await.disarm();

        let notice = match self.api.start().await {
            Ok(reply) => {
                info!(reply = %reply.message, "Engine started");
                self.keepalive
                    .lock()
                    .await
                    .arm(Arc::clone(&self.api), self.keepalive_interval);
                Notice::success(reply_text(reply, "Bot started"))
            }
            Err(e) => {
                warn!(error = %e, "Engine start failed");
                Notice::error(failure_text(START_FAILED, &e))
            }
        };

        self.finish(notice).await
    }

    /// Stops the engine. The keep-alive is cancelled before the request.
    pub async fn stop(&self) -> Notice {
        let _guard = self.run_control.lock().await;
        self.set_loading(true).await;
        self.keepalive.lock().await.disarm();

        let notice = match self.api.stop().await {
            Ok(reply) => {
                info!(reply = %reply.message, "Engine stopped");
                Notice::success(reply_text(reply, "Bot stopped"))
            }
            Err(e) => {
                warn!(error = %e, "Engine stop failed");
                Notice::error(failure_text(STOP_FAILED, &e))
            }
        };

        self.finish(notice).await
    }

    /// Stops a running engine, starts a stopped one.
    pub async fn toggle(&self) -> Notice {
        let running = self.view.read().await.is_running();
        if running {
            self.stop().await
        } else {
            self.start().await
        }
    }

    pub async fn execute(&self, action: EngineAction) -> Notice {
        self.set_loading(true).await;

        let notice = match self.api.trigger(action).await {
            Ok(()) => {
                info!(action = %action, "Engine action executed");
                Notice::success(format!("{} executed successfully", action.label()))
            }
            Err(e) => {
                warn!(action = %action, error = %e, "Engine action failed");
                Notice::error(format!("Failed to execute {action}"))
            }
        };

        self.finish(notice).await
    }

    /// Cancels the keep-alive. Safe to call more than once.
    ///
    /// Waits for an in-flight start so it cannot re-arm afterwards.
    pub async fn shutdown(&self) {
        let _guard = self.run_control.lock().await;
        if self.keepalive.lock().await.disarm() {
            info!("Dashboard shut down with keep-alive cancelled");
        }
    }

    // ===== Internal =====

    async fn set_loading(&self, loading: bool) {
        self.view.write().await.loading = loading;
    }

    async fn set_notice(&self, notice: Notice) {
        self.view.write().await.notice = Some(notice);
    }

    /// Records the notice, reloads after a success and clears `loading`.
    async fn finish(&self, notice: Notice) -> Notice {
        let succeeded = !notice.is_error();
        self.set_notice(notice.clone()).await;
        if succeeded {
            self.fetch_all().await;
        }
        self.set_loading(false).await;
        notice
    }
}

fn reply_text(reply: EngineMessage, fallback: &str) -> String {
    if reply.message.is_empty() {
        fallback.to_string()
    } else {
        reply.message
    }
}

fn failure_text(base: &str, error: &EngineError) -> String {
    match error.detail() {
        Some(detail) => format!("{base}: {detail}"),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quantbot_core::{EngineStatus, TradingConfig};
    use quantbot_engine_client::Result;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Scripted engine that records every call.
    #[derive(Default)]
    struct FakeEngine {
        calls: std::sync::Mutex<Vec<String>>,
        running: AtomicBool,
        fail_reads: AtomicBool,
        fail_status: AtomicBool,
        fail_start: AtomicBool,
        fail_stop: AtomicBool,
        fail_trigger: AtomicBool,
        start_delay_ms: AtomicU64,
        reject_update: std::sync::Mutex<Option<EngineError>>,
    }

    impl FakeEngine {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn count(&self, call: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn assert_one_full_fetch(&self) {
            for read in ["GET /config", "GET /status", "GET /positions", "GET /orders"] {
                assert_eq!(self.count(read), 1, "{read}");
            }
        }

        fn read_error(&self) -> Result<()> {
            if self.fail_reads.load(Ordering::SeqCst) {
                Err(EngineError::Network("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl EngineApi for FakeEngine {
        async fn get_config(&self) -> Result<TradingConfig> {
            self.record("GET /config");
            self.read_error()?;
            Ok(TradingConfig {
                leverage: 10,
                max_trades: 5,
                ..Default::default()
            })
        }

        async fn update_config(&self, update: &ConfigUpdate) -> Result<()> {
            self.record(format!("POST /config {}={}", update.key, update.value));
            match self.reject_update.lock().unwrap().take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn get_status(&self) -> Result<EngineStatus> {
            self.record("GET /status");
            self.read_error()?;
            if self.fail_status.load(Ordering::SeqCst) {
                return Err(EngineError::api(500, None));
            }
            Ok(EngineStatus {
                running: self.running.load(Ordering::SeqCst),
                run_count: 3,
                total_trades_open: 1,
            })
        }

        async fn get_positions(&self) -> Result<Vec<Value>> {
            self.record("GET /positions");
            self.read_error()?;
            Ok(vec![json!({"symbol": "BTCUSDT", "qty": 0.01})])
        }

        async fn get_orders(&self) -> Result<Vec<Value>> {
            self.record("GET /orders");
            self.read_error()?;
            Ok(Vec::new())
        }

        async fn start(&self) -> Result<EngineMessage> {
            self.record("POST /start");
            let delay = self.start_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.fail_start.load(Ordering::SeqCst) {
                return Err(EngineError::api(400, Some("Bot is already running".into())));
            }
            self.running.store(true, Ordering::SeqCst);
            Ok(EngineMessage {
                message: "Bot started successfully".to_string(),
            })
        }

        async fn stop(&self) -> Result<EngineMessage> {
            self.record("POST /stop");
            if self.fail_stop.load(Ordering::SeqCst) {
                return Err(EngineError::Network("connection reset".to_string()));
            }
            self.running.store(false, Ordering::SeqCst);
            Ok(EngineMessage {
                message: "Bot stopped successfully".to_string(),
            })
        }

        async fn trigger(&self, action: EngineAction) -> Result<()> {
            self.record(format!("POST {}", action.path()));
            if self.fail_trigger.load(Ordering::SeqCst) {
                return Err(EngineError::api(500, None));
            }
            Ok(())
        }
    }

    const INTERVAL: Duration = Duration::from_secs(600);

    fn dashboard() -> (Arc<FakeEngine>, Dashboard) {
        let engine = Arc::new(FakeEngine::default());
        let dashboard = Dashboard::new(engine.clone(), INTERVAL);
        (engine, dashboard)
    }

    #[tokio::test]
    async fn test_fetch_all_populates_view() {
        let (engine, dashboard) = dashboard();
        assert!(!dashboard.snapshot().await.is_ready());

        assert!(dashboard.fetch_all().await);

        let view = dashboard.snapshot().await;
        assert!(view.is_ready());
        assert_eq!(view.config.unwrap().leverage, 10);
        assert_eq!(view.status.unwrap().run_count, 3);
        assert_eq!(view.positions.len(), 1);
        assert!(view.orders.is_empty());
        assert!(view.notice.is_none());
        assert!(view.last_refreshed.is_some());
        assert_eq!(engine.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_fetch_failure_sets_notice_and_keeps_previous_fields() {
        let (engine, dashboard) = dashboard();
        assert!(dashboard.fetch_all().await);
        let first_refresh = dashboard.snapshot().await.last_refreshed;

        engine.fail_status.store(true, Ordering::SeqCst);
        engine.running.store(true, Ordering::SeqCst);
        assert!(!dashboard.fetch_all().await);

        let view = dashboard.snapshot().await;
        assert_eq!(view.notice, Some(Notice::error(FETCH_FAILED)));
        // Status kept from the first fetch, not replaced
        assert!(!view.status.unwrap().running);
        assert_eq!(view.last_refreshed, first_refresh);
        assert!(view.is_ready());
    }

    #[tokio::test]
    async fn test_fetch_failure_before_first_load_stays_not_ready() {
        let (engine, dashboard) = dashboard();
        engine.fail_reads.store(true, Ordering::SeqCst);

        assert!(!dashboard.fetch_all().await);
        let view = dashboard.snapshot().await;
        assert!(!view.is_ready());
        assert!(view.notice.unwrap().is_error());
    }

    #[tokio::test]
    async fn test_update_config_success_refetches() {
        let (engine, dashboard) = dashboard();

        let notice = dashboard.update_config(ConfigKey::DryRun, json!(false)).await;

        assert_eq!(notice, Notice::success("DRY_RUN updated successfully"));
        assert_eq!(engine.calls()[0], "POST /config DRY_RUN=false");
        assert_eq!(engine.count("POST /config DRY_RUN=false"), 1);
        assert_eq!(engine.calls().len(), 5);
        engine.assert_one_full_fetch();
        assert_eq!(dashboard.snapshot().await.notice, Some(notice));
    }

    #[tokio::test]
    async fn test_update_config_engine_detail() {
        let (engine, dashboard) = dashboard();
        *engine.reject_update.lock().unwrap() =
            Some(EngineError::api(400, Some("LEVERAGE must be <= 125".into())));

        let notice = dashboard.update_config(ConfigKey::Leverage, json!(200)).await;

        assert_eq!(notice, Notice::error("Error: LEVERAGE must be <= 125"));
        assert_eq!(engine.count("GET /config"), 0);
    }

    #[tokio::test]
    async fn test_update_config_network_failure() {
        let (engine, dashboard) = dashboard();
        *engine.reject_update.lock().unwrap() =
            Some(EngineError::Network("connection refused".into()));

        let notice = dashboard.update_config(ConfigKey::Tp, json!(0.05)).await;
        assert_eq!(notice, Notice::error(UPDATE_FAILED));
    }

    #[tokio::test]
    async fn test_update_config_raw_parses_input() {
        let (engine, dashboard) = dashboard();

        let notice = dashboard.update_config_raw("max_trades", "7").await;
        assert!(!notice.is_error());
        assert_eq!(engine.calls()[0], "POST /config MAX_TRADES=7");
    }

    #[tokio::test]
    async fn test_update_config_raw_rejects_without_request() {
        let (engine, dashboard) = dashboard();

        let unknown = dashboard.update_config_raw("NOT_A_KEY", "1").await;
        assert!(unknown.is_error());
        assert!(unknown.text.contains("NOT_A_KEY"));

        let read_only = dashboard.update_config_raw("TOTAL_TRADES_OPEN", "4").await;
        assert!(read_only.is_error());

        let isolated = dashboard.update_config_raw("TYPE", "ISOLATED").await;
        assert!(isolated.is_error());

        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_start_success_arms_keepalive() {
        let (engine, dashboard) = dashboard();

        let notice = dashboard.start().await;

        assert_eq!(notice, Notice::success("Bot started successfully"));
        let view = dashboard.snapshot().await;
        assert!(view.keepalive_active);
        assert!(!view.loading);
        assert!(view.is_running());
        assert_eq!(engine.count("POST /start"), 1);
        assert_eq!(engine.calls()[0], "POST /start");
        engine.assert_one_full_fetch();

        dashboard.shutdown().await;
        assert!(!dashboard.snapshot().await.keepalive_active);
    }

    #[tokio::test]
    async fn test_start_failure_leaves_keepalive_disarmed() {
        let (engine, dashboard) = dashboard();
        engine.fail_start.store(true, Ordering::SeqCst);

        let notice = dashboard.start().await;

        assert_eq!(notice, Notice::error("Failed to start bot: Bot is already running"));
        let view = dashboard.snapshot().await;
        assert!(!view.keepalive_active);
        assert!(!view.loading);
        assert_eq!(engine.count("GET /status"), 0);
    }

    #[tokio::test]
    async fn test_stop_failure_message() {
        let (engine, dashboard) = dashboard();
        engine.fail_stop.store(true, Ordering::SeqCst);

        let notice = dashboard.stop().await;
        assert_eq!(notice, Notice::error(STOP_FAILED));
    }

    #[tokio::test]
    async fn test_toggle_follows_last_known_status() {
        let (engine, dashboard) = dashboard();
        dashboard.fetch_all().await;

        dashboard.toggle().await;
        assert_eq!(engine.count("POST /start"), 1);
        assert!(dashboard.snapshot().await.is_running());

        dashboard.toggle().await;
        assert_eq!(engine.count("POST /stop"), 1);
        let view = dashboard.snapshot().await;
        assert!(!view.is_running());
        assert!(!view.keepalive_active);
    }

    #[tokio::test]
    async fn test_execute_actions() {
        let (engine, dashboard) = dashboard();

        let notice = dashboard.execute(EngineAction::RunStrategy).await;
        assert_eq!(notice, Notice::success("run strategy executed successfully"));
        assert_eq!(engine.count("POST /run_strategy"), 1);
        assert_eq!(engine.calls()[0], "POST /run_strategy");
        engine.assert_one_full_fetch();

        engine.fail_trigger.store(true, Ordering::SeqCst);
        let notice = dashboard.execute(EngineAction::Refresh).await;
        assert_eq!(notice, Notice::error("Failed to execute refresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_pings_until_stop() {
        let (engine, dashboard) = dashboard();

        dashboard.start().await;
        assert_eq!(engine.count("POST /start"), 1);

        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(engine.count("POST /start"), 2);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(engine.count("POST /start"), 3);

        dashboard.stop().await;
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(engine.count("POST /start"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_start_keeps_single_timer() {
        let (engine, dashboard) = dashboard();

        dashboard.start().await;
        dashboard.start().await;
        dashboard.start().await;
        assert_eq!(engine.count("POST /start"), 3);

        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(engine.count("POST /start"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_start_cancels_running_timer() {
        let (engine, dashboard) = dashboard();
        dashboard.start().await;

        engine.fail_start.store(true, Ordering::SeqCst);
        dashboard.start().await;
        assert!(!dashboard.snapshot().await.keepalive_active);

        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(engine.count("POST /start"), 2);
    }

    #[tokio::test]
    async fn test_refresh_if_stale_skips_recent_fetch() {
        let (engine, dashboard) = dashboard();

        assert!(dashboard.refresh_if_stale(Duration::from_secs(60)).await);
        assert_eq!(engine.count("GET /config"), 1);

        assert!(dashboard.refresh_if_stale(Duration::from_secs(60)).await);
        assert_eq!(engine.count("GET /config"), 1);

        assert!(dashboard.refresh_if_stale(Duration::ZERO).await);
        assert_eq!(engine.count("GET /config"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_slow_start_leaves_keepalive_disarmed() {
        let engine = Arc::new(FakeEngine::default());
        engine.start_delay_ms.store(2_000, Ordering::SeqCst);
        let dashboard = Arc::new(Dashboard::new(engine.clone(), INTERVAL));

        let starting = tokio::spawn({
            let dashboard = Arc::clone(&dashboard);
            async move { dashboard.start().await }
        });
        tokio::time::sleep(Duration::from_millis(500)).await;
        let stopped = dashboard.stop().await;
        let started = starting.await.unwrap();

        assert!(!started.is_error());
        assert!(!stopped.is_error());
        let view = dashboard.snapshot().await;
        assert!(!view.keepalive_active);
        assert!(!view.is_running());

        let run_calls: Vec<String> = engine
            .calls()
            .into_iter()
            .filter(|c| c == "POST /start" || c == "POST /stop")
            .collect();
        assert_eq!(run_calls, vec!["POST /start", "POST /stop"]);

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(engine.count("POST /start"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_slow_start_leaves_keepalive_disarmed() {
        let engine = Arc::new(FakeEngine::default());
        engine.start_delay_ms.store(2_000, Ordering::SeqCst);
        let dashboard = Arc::new(Dashboard::new(engine.clone(), INTERVAL));

        let starting = tokio::spawn({
            let dashboard = Arc::clone(&dashboard);
            async move { dashboard.start().await }
        });
        tokio::time::sleep(Duration::from_millis(500)).await;
        dashboard.shutdown().await;
        starting.await.unwrap();

        assert!(!dashboard.snapshot().await.keepalive_active);
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(engine.count("POST /start"), 1);
    }
}
