//! Client for the QuantBot trading engine's REST API.
//!
//! This crate provides:
//! - [`EngineClient`], a reqwest-based client for every engine endpoint
//! - [`EngineApi`], the trait the dashboard controller is written against
//! - [`EngineError`], with the engine's `detail` message preserved
//!
//! # API Endpoints
//!
//! - `GET /config` - Current trading parameters
//! - `POST /config` - Update one parameter (`{ key, value }`)
//! - `GET /status` - Running flag, run counter, open trades
//! - `GET /positions` - Open positions
//! - `GET /orders` - Recent orders
//! - `POST /start`, `POST /stop` - Engine run control
//! - `POST /refresh`, `POST /run_strategy` - One-off triggers

pub mod api;
pub mod client;
pub mod error;

pub use api::{EngineAction, EngineApi};
pub use client::{EngineClient, EngineClientConfig};
pub use error::{EngineError, Result};
