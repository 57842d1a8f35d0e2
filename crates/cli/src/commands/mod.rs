//! CLI commands for the QuantBot engine.

pub mod control;
pub mod inspect;
pub mod serve;

pub use control::{run_action, run_set, run_start, run_stop, SetArgs, StartArgs};
pub use inspect::{run_config, run_orders, run_positions, run_status};
pub use serve::{run_serve, ServeArgs};
