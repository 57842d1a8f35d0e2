use anyhow::Result;
use clap::Args;
use quantbot_controller::Dashboard;
use quantbot_core::AppConfig;
use quantbot_web_api::WebServer;
use std::sync::Arc;

/// Arguments for the serve command.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen address (defaults to server.host:server.port from the config)
    #[arg(short, long)]
    pub addr: Option<String>,
}

/// Runs the web dashboard until Ctrl-C or SIGTERM.
///
/// # Errors
/// Returns an error if the server cannot bind or fails while serving.
pub async fn run_serve(dashboard: Arc<Dashboard>, config: &AppConfig, args: ServeArgs) -> Result<()> {
    let addr = args.addr.unwrap_or_else(|| config.server.addr());
    tracing::info!(
        engine = %config.engine.base_url,
        keepalive_secs = config.engine.keepalive_interval_secs,
        "Starting web dashboard"
    );

    WebServer::new(dashboard).serve(&addr).await
}
