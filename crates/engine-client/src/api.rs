use crate::error::{EngineError, Result};
use async_trait::async_trait;
use quantbot_core::{ConfigUpdate, EngineMessage, EngineStatus, TradingConfig};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Fire-and-forget engine triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineAction {
    Refresh,
    RunStrategy,
}

impl EngineAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::RunStrategy => "run_strategy",
        }
    }

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Refresh => "/refresh",
            Self::RunStrategy => "/run_strategy",
        }
    }

    /// Name with underscores turned into spaces, e.g. "run strategy".
    #[must_use]
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for EngineAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "refresh" => Ok(Self::Refresh),
            "run_strategy" | "run-strategy" => Ok(Self::RunStrategy),
            other => Err(EngineError::Configuration(format!(
                "unknown engine action: {other}"
            ))),
        }
    }
}

/// The engine's REST surface.
///
/// Implemented by [`crate::EngineClient`]; the dashboard controller only
/// depends on this trait.
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// `GET /config`
    async fn get_config(&self) -> Result<TradingConfig>;

    /// `POST /config` with `{ key, value }`.
    async fn update_config(&self, update: &ConfigUpdate) -> Result<()>;

    /// `GET /status`
    async fn get_status(&self) -> Result<EngineStatus>;

    /// `GET /positions`, unwrapped from `{ positions: [...] }`.
    async fn get_positions(&self) -> Result<Vec<Value>>;

    /// `GET /orders`, unwrapped from `{ orders: [...] }`.
    async fn get_orders(&self) -> Result<Vec<Value>>;

    /// `POST /start`
    async fn start(&self) -> Result<EngineMessage>;

    /// `POST /stop`
    async fn stop(&self) -> Result<EngineMessage>;

    /// `POST /refresh` or `POST /run_strategy`.
    async fn trigger(&self, action: EngineAction) -> Result<()>;
}
