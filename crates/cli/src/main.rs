use anyhow::Context;
use clap::{Parser, Subcommand};
use quantbot_controller::Dashboard;
use quantbot_core::{AppConfig, ConfigLoader};
use quantbot_engine_client::{EngineAction, EngineApi, EngineClient, EngineClientConfig};
use std::sync::Arc;

mod commands;
mod tui_dashboard;

use commands::{ServeArgs, SetArgs, StartArgs};

#[derive(Parser)]
#[command(name = "quantbot")]
#[command(about = "Dashboard and control CLI for the QuantBot trading engine", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, env = "QUANTBOT_CONFIG", default_value = "config/Config.toml")]
    config: String,

    /// Engine base URL (overrides the config file and environment)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the web dashboard
    Serve(ServeArgs),
    /// Interactive terminal dashboard
    Tui {
        /// Optional log file path (logs to file instead of stderr)
        #[arg(long)]
        log_file: Option<String>,
    },
    /// Show engine status
    Status,
    /// Show the trading configuration
    Config,
    /// List open positions
    Positions,
    /// List recent orders
    Orders,
    /// Update one configuration parameter
    Set(SetArgs),
    /// Start the engine
    Start(StartArgs),
    /// Stop the engine
    Stop,
    /// Ask the engine to refresh market data
    Refresh,
    /// Run the strategy once
    RunStrategy,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Other commands log to stderr. The TUI logs to --log-file, or nowhere,
    // to keep the screen intact.
    match &cli.command {
        Commands::Tui {
            log_file: Some(path),
        } => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        Commands::Tui { .. } => {}
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .with_writer(std::io::stderr)
                .init();
        }
    }

    let config = load_config(&cli.config, cli.base_url.as_deref())?;
    let client = Arc::new(EngineClient::new(EngineClientConfig::from(&config.engine))?);
    tracing::debug!(base_url = client.base_url(), "Engine client ready");
    let dashboard = Arc::new(Dashboard::new(
        client.clone(),
        config.engine.keepalive_interval(),
    ));

    let api: &dyn EngineApi = client.as_ref();
    match cli.command {
        Commands::Serve(args) => commands::run_serve(dashboard, &config, args).await?,
        Commands::Tui { log_file: _ } => tui_dashboard::run(dashboard).await?,
        Commands::Status => commands::run_status(api).await?,
        Commands::Config => commands::run_config(api).await?,
        Commands::Positions => commands::run_positions(api).await?,
        Commands::Orders => commands::run_orders(api).await?,
        Commands::Set(args) => commands::run_set(&dashboard, args).await?,
        Commands::Start(args) => commands::run_start(&dashboard, args).await?,
        Commands::Stop => commands::run_stop(&dashboard).await?,
        Commands::Refresh => commands::run_action(&dashboard, EngineAction::Refresh).await?,
        Commands::RunStrategy => {
            commands::run_action(&dashboard, EngineAction::RunStrategy).await?;
        }
    }

    Ok(())
}

/// Loads the config file (missing file means defaults) and applies the CLI override.
fn load_config(path: &str, base_url: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut config = ConfigLoader::load_from(path)
        .with_context(|| format!("Failed to load configuration from {path}"))?;

    if let Some(url) = base_url {
        config.engine.base_url = url.trim_end_matches('/').to_string();
        config.validate()?;
    }

    tracing::debug!(
        base_url = %config.engine.base_url,
        timeout_secs = config.engine.timeout_secs,
        keepalive_secs = config.engine.keepalive_interval_secs,
        "Configuration loaded"
    );
    Ok(config)
}
