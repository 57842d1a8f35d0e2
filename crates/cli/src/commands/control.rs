use anyhow::{bail, Result};
use clap::Args;
use quantbot_controller::{Dashboard, Notice};
use quantbot_engine_client::EngineAction;
use quantbot_web_api::shutdown_signal;

/// Arguments for the set command.
#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    /// Parameter key, e.g. LEVERAGE or max_trades
    pub key: String,
    /// New value, e.g. 20, 0.05, true, volume
    pub value: String,
}

/// Arguments for the start command.
#[derive(Args, Debug, Clone)]
pub struct StartArgs {
    /// Stay running and re-send start periodically until Ctrl-C
    #[arg(long)]
    pub keep_alive: bool,
}

/// Prints the notice; error notices become the command's error.
fn report(notice: Notice) -> Result<()> {
    if notice.is_error() {
        bail!(notice.text);
    }
    println!("{}", notice.text);
    Ok(())
}

/// # Errors
/// Returns an error if the input is invalid or the engine rejects the update.
pub async fn run_set(dashboard: &Dashboard, args: SetArgs) -> Result<()> {
    report(dashboard.update_config_raw(&args.key, &args.value).await)
}

/// Starts the engine, optionally holding the keep-alive open until a shutdown signal.
///
/// # Errors
/// Returns an error if the engine refuses to start.
pub async fn run_start(dashboard: &Dashboard, args: StartArgs) -> Result<()> {
    report(dashboard.start().await)?;

    if args.keep_alive {
        println!(
            "Keep-alive every {}s, press Ctrl-C to exit",
            dashboard.keepalive_interval().as_secs()
        );
        shutdown_signal().await;
    }

    dashboard.shutdown().await;
    Ok(())
}

/// # Errors
/// Returns an error if the engine fails to stop.
pub async fn run_stop(dashboard: &Dashboard) -> Result<()> {
    report(dashboard.stop().await)
}

/// # Errors
/// Returns an error if the engine rejects the action.
pub async fn run_action(dashboard: &Dashboard, action: EngineAction) -> Result<()> {
    report(dashboard.execute(action).await)
}
