//! Data models mirrored from the trading engine's JSON responses.
//!
//! The engine owns every invariant on these values; the dashboard only
//! reflects what it returns and replaces each model wholesale on every poll.

use crate::params::ConfigKey;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

// =============================================================================
// Trading Configuration
// =============================================================================

/// Trading parameters as returned by `GET /config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TradingConfig {
    #[serde(deserialize_with = "null_as_default")]
    pub simulation_mode: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub dry_run: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub risk_reward_ratio: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_portfolio_risk: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub trade_fee_rate: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub price_update_threshold: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub spread_adjustment: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub dynamic_position_sizing: bool,
    #[serde(deserialize_with = "lenient_int")]
    pub leverage: i64,
    #[serde(rename = "TYPE", deserialize_with = "null_as_default")]
    pub margin_type: MarginType,
    /// Take-profit as a ratio (0.05 = 5%).
    #[serde(deserialize_with = "null_as_default")]
    pub tp: f64,
    /// Stop-loss as a ratio.
    #[serde(deserialize_with = "null_as_default")]
    pub sl: f64,
    #[serde(deserialize_with = "lenient_int")]
    pub pairs_to_process: i64,
    #[serde(rename = "SORTBY", deserialize_with = "null_as_default")]
    pub sort_by: SortBy,
    /// Maintained by the engine; not editable.
    #[serde(deserialize_with = "lenient_int")]
    pub total_trades_open: i64,
    #[serde(deserialize_with = "lenient_int")]
    pub max_trades: i64,

    /// Keys the engine returns beyond the known set.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TradingConfig {
    /// Returns the current value of a parameter as the engine would send it.
    #[must_use]
    pub fn value_of(&self, key: ConfigKey) -> Value {
        match key {
            ConfigKey::SimulationMode => json!(self.simulation_mode),
            ConfigKey::DryRun => json!(self.dry_run),
            ConfigKey::RiskRewardRatio => json!(self.risk_reward_ratio),
            ConfigKey::MaxPortfolioRisk => json!(self.max_portfolio_risk),
            ConfigKey::TradeFeeRate => json!(self.trade_fee_rate),
            ConfigKey::PriceUpdateThreshold => json!(self.price_update_threshold),
            ConfigKey::SpreadAdjustment => json!(self.spread_adjustment),
            ConfigKey::DynamicPositionSizing => json!(self.dynamic_position_sizing),
            ConfigKey::Leverage => json!(self.leverage),
            ConfigKey::Type => json!(self.margin_type),
            ConfigKey::Tp => json!(self.tp),
            ConfigKey::Sl => json!(self.sl),
            ConfigKey::PairsToProcess => json!(self.pairs_to_process),
            ConfigKey::SortBy => json!(self.sort_by),
            ConfigKey::TotalTradesOpen => json!(self.total_trades_open),
            ConfigKey::MaxTrades => json!(self.max_trades),
        }
    }
}

/// Accepts integers that the engine may serialize as `10` or `10.0`.
fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| serde::de::Error::custom(format!("expected integer, got {n}"))),
        Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!(
            "expected integer, got {other}"
        ))),
    }
}

/// Margin type for futures positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarginType {
    #[default]
    Crossed,
    /// Listed by the engine but not supported for trading.
    Isolated,
    /// Any other value, kept verbatim.
    #[serde(untagged)]
    Other(String),
}

/// Ordering used by the engine when selecting pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Volume,
    Price,
    /// Any other value, kept verbatim.
    #[serde(untagged)]
    Other(String),
}

// =============================================================================
// Engine State
// =============================================================================

/// Run-state snapshot from `GET /status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub running: bool,
    #[serde(default)]
    pub run_count: u64,
    #[serde(default)]
    pub total_trades_open: u64,
}

/// Body of `GET /positions`. Records are opaque and rendered verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub positions: Vec<Value>,
}

/// Body of `GET /orders`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrdersResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub orders: Vec<Value>,
}

/// Treats `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Requests and Replies
// =============================================================================

/// Body of `POST /config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub key: String,
    pub value: Value,
}

impl ConfigUpdate {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Reply of `POST /start` and `POST /stop`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMessage {
    #[serde(default)]
    pub message: String,
}

/// Error body the engine sends with non-2xx responses.
///
/// `detail` is usually a string but validation failures carry a JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: Value,
}

impl ErrorDetail {
    /// Renders the detail as display text.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
