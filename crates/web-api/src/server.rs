use crate::handlers;
use axum::{
    routing::{get, post},
    Router,
};
use quantbot_controller::Dashboard;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct WebServer {
    dashboard: Arc<Dashboard>,
}

impl WebServer {
    #[must_use]
    pub const fn new(dashboard: Arc<Dashboard>) -> Self {
        Self { dashboard }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/", get(handlers::landing))
            .route("/dashboard", get(handlers::dashboard_page))
            .route("/dashboard/config", post(handlers::update_config))
            .route("/dashboard/toggle", post(handlers::toggle))
            .route("/dashboard/start", post(handlers::start))
            .route("/dashboard/stop", post(handlers::stop))
            .route("/dashboard/actions/:action", post(handlers::execute))
            .route("/api/dashboard", get(handlers::api_dashboard))
            .route("/health", get(handlers::health))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.dashboard.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// Runs until Ctrl-C or SIGTERM, then cancels the keep-alive.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Dashboard listening on http://{}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.dashboard.shutdown().await;
        tracing::info!("Dashboard server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use quantbot_core::{ConfigUpdate, EngineMessage, EngineStatus, TradingConfig};
    use quantbot_engine_client::{EngineAction, EngineApi, EngineError, Result};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubEngine {
        offline: bool,
        config_reads: AtomicUsize,
        updates: Mutex<Vec<ConfigUpdate>>,
        triggers: Mutex<Vec<EngineAction>>,
    }

    impl StubEngine {
        fn check(&self) -> Result<()> {
            if self.offline {
                Err(EngineError::Network("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl EngineApi for StubEngine {
        async fn get_config(&self) -> Result<TradingConfig> {
            self.config_reads.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(TradingConfig {
                leverage: 15,
                max_trades: 4,
                ..Default::default()
            })
        }
        async fn update_config(&self, update: &ConfigUpdate) -> Result<()> {
            self.updates.lock().unwrap().push(update.clone());
            Ok(())
        }
        async fn get_status(&self) -> Result<EngineStatus> {
            self.check()?;
            Ok(EngineStatus {
                running: false,
                run_count: 7,
                total_trades_open: 0,
            })
        }
        async fn get_positions(&self) -> Result<Vec<Value>> {
            self.check()?;
            Ok(Vec::new())
        }
        async fn get_orders(&self) -> Result<Vec<Value>> {
            self.check()?;
            Ok(Vec::new())
        }
        async fn start(&self) -> Result<EngineMessage> {
            Ok(EngineMessage {
                message: "Bot started".to_string(),
            })
        }
        async fn stop(&self) -> Result<EngineMessage> {
            Ok(EngineMessage {
                message: "Bot stopped".to_string(),
            })
        }
        async fn trigger(&self, action: EngineAction) -> Result<()> {
            self.triggers.lock().unwrap().push(action);
            Ok(())
        }
    }

    fn server(engine: Arc<StubEngine>) -> (Arc<Dashboard>, Router) {
        let dashboard = Arc::new(Dashboard::new(engine, Duration::from_secs(600)));
        let router = WebServer::new(dashboard.clone()).router();
        (dashboard, router)
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (_, router) = server(Arc::new(StubEngine::default()));
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("ok"));
    }

    #[tokio::test]
    async fn test_landing_links_to_dashboard() {
        let (_, router) = server(Arc::new(StubEngine::default()));
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Open Dashboard"));
    }

    #[tokio::test]
    async fn test_dashboard_renders_engine_state() {
        let (_, router) = server(Arc::new(StubEngine::default()));
        let response = router
            .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("STOPPED"));
        assert!(html.contains("Start Bot"));
        assert!(html.contains("15x"));
    }

    #[tokio::test]
    async fn test_dashboard_shows_loading_when_engine_offline() {
        let engine = Arc::new(StubEngine {
            offline: true,
            ..Default::default()
        });
        let (_, router) = server(engine);
        let response = router
            .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let html = body_text(response).await;
        assert!(html.contains("Loading dashboard..."));
        assert!(html.contains("Failed to connect to trading bot API"));
    }

    #[tokio::test]
    async fn test_config_form_redirects_to_config_tab() {
        let engine = Arc::new(StubEngine::default());
        let (dashboard, router) = server(engine.clone());

        let response = router
            .oneshot(post_form("/dashboard/config", "key=LEVERAGE&value=25"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/dashboard?tab=config"
        );
        let updates = engine.updates.lock().unwrap().clone();
        assert_eq!(updates, vec![ConfigUpdate::new("LEVERAGE", 25)]);
        let notice = dashboard.snapshot().await.notice.unwrap();
        assert_eq!(notice.text, "LEVERAGE updated successfully");
    }

    #[tokio::test]
    async fn test_invalid_config_form_sends_nothing() {
        let engine = Arc::new(StubEngine::default());
        let (dashboard, router) = server(engine.clone());

        let response = router
            .oneshot(post_form("/dashboard/config", "key=MAX_TRADES&value=500"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(engine.updates.lock().unwrap().is_empty());
        assert!(dashboard.snapshot().await.notice.unwrap().is_error());
    }

    #[tokio::test]
    async fn test_action_routes() {
        let engine = Arc::new(StubEngine::default());
        let (_, router) = server(engine.clone());

        let response = router
            .clone()
            .oneshot(post_form("/dashboard/actions/run_strategy", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            *engine.triggers.lock().unwrap(),
            vec![EngineAction::RunStrategy]
        );

        let response = router
            .oneshot(post_form("/dashboard/actions/liquidate", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_start_arms_keepalive_and_shutdown_cancels() {
        let (dashboard, router) = server(Arc::new(StubEngine::default()));

        let response = router
            .clone()
            .oneshot(post_form("/dashboard/start", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = router
            .oneshot(Request::get("/api/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["keepalive_active"], true);
        assert_eq!(json["notice"]["text"], "Bot started");

        dashboard.shutdown().await;
        assert!(!dashboard.snapshot().await.keepalive_active);
    }

    #[tokio::test]
    async fn test_redirect_after_action_reuses_fresh_view() {
        let engine = Arc::new(StubEngine::default());
        let (_, router) = server(engine.clone());

        router
            .clone()
            .oneshot(post_form("/dashboard/actions/refresh", ""))
            .await
            .unwrap();
        assert_eq!(engine.config_reads.load(Ordering::SeqCst), 1);

        let response = router
            .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("refresh executed successfully"));
        assert_eq!(engine.config_reads.load(Ordering::SeqCst), 1);
    }
}
