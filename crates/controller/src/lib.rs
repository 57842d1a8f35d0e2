//! Dashboard controller for the QuantBot trading engine.
//!
//! [`Dashboard`] keeps the most recently fetched engine state, turns every
//! user action into engine requests plus a [`Notice`], and owns the
//! [`KeepAlive`] timer that re-sends `POST /start` while the engine runs.

pub mod dashboard;
pub mod keepalive;
pub mod view;

pub use dashboard::Dashboard;
pub use keepalive::KeepAlive;
pub use view::{DashboardView, Notice, NoticeLevel};
