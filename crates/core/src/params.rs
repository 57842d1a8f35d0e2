//! Catalogue of the engine's tunable parameters.
//!
//! Each key carries the label, group and input control the dashboard shows
//! for it. The engine validates every update; the bounds here are the
//! limits of the input widgets, so raw input outside them is refused before
//! any request is sent.

use crate::models::TradingConfig;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while turning raw input into a parameter value.
#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    #[error("{key} is read-only")]
    ReadOnly { key: &'static str },

    #[error("invalid value for {key}: '{input}' ({reason})")]
    InvalidValue {
        key: &'static str,
        input: String,
        reason: String,
    },

    #[error("{key} must be between {min} and {max}, got {value}")]
    OutOfRange {
        key: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("{key} option '{option}' is not supported")]
    UnsupportedOption { key: &'static str, option: String },
}

/// Card a parameter is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamGroup {
    TradingMode,
    RiskManagement,
    TradingParameters,
    Advanced,
}

impl ParamGroup {
    pub const ALL: [Self; 4] = [
        Self::TradingMode,
        Self::RiskManagement,
        Self::TradingParameters,
        Self::Advanced,
    ];

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::TradingMode => "Trading Mode",
            Self::RiskManagement => "Risk Management",
            Self::TradingParameters => "Trading Parameters",
            Self::Advanced => "Advanced Settings",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::TradingMode => "Configure simulation and execution modes",
            Self::RiskManagement => "Configure risk parameters and limits",
            Self::TradingParameters => "Configure leverage and trading limits",
            Self::Advanced => "Fine-tune trading parameters",
        }
    }

    /// Keys in this group, in display order.
    pub fn keys(self) -> impl Iterator<Item = ConfigKey> {
        ConfigKey::ALL.into_iter().filter(move |k| k.group() == self)
    }
}

/// One entry of a choice control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: &'static str,
    pub label: &'static str,
    pub disabled: bool,
}

const MARGIN_TYPE_OPTIONS: &[ChoiceOption] = &[
    ChoiceOption {
        value: "CROSSED",
        label: "Crossed",
        disabled: false,
    },
    ChoiceOption {
        value: "ISOLATED",
        label: "Isolated (Not Supported)",
        disabled: true,
    },
];

const SORT_BY_OPTIONS: &[ChoiceOption] = &[
    ChoiceOption {
        value: "volume",
        label: "Volume",
        disabled: false,
    },
    ChoiceOption {
        value: "price",
        label: "Price",
        disabled: false,
    },
];

/// Input control used to edit a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Toggle,
    Slider { min: f64, max: f64, step: f64 },
    Integer { min: i64, max: i64 },
    Decimal { step: f64 },
    Choice(&'static [ChoiceOption]),
    ReadOnly,
}

impl Control {
    /// Whether a slider produces whole numbers only.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        matches!(self, Self::Slider { step, .. } if step.fract() == 0.0)
            || matches!(self, Self::Integer { .. })
    }
}

/// Key of a tunable engine parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    SimulationMode,
    DryRun,
    DynamicPositionSizing,
    RiskRewardRatio,
    MaxPortfolioRisk,
    Tp,
    Sl,
    Leverage,
    MaxTrades,
    PairsToProcess,
    Type,
    SortBy,
    TradeFeeRate,
    PriceUpdateThreshold,
    SpreadAdjustment,
    TotalTradesOpen,
}

impl ConfigKey {
    /// All keys in form order.
    pub const ALL: [Self; 16] = [
        Self::SimulationMode,
        Self::DryRun,
        Self::DynamicPositionSizing,
        Self::RiskRewardRatio,
        Self::MaxPortfolioRisk,
        Self::Tp,
        Self::Sl,
        Self::Leverage,
        Self::MaxTrades,
        Self::PairsToProcess,
        Self::Type,
        Self::SortBy,
        Self::TradeFeeRate,
        Self::PriceUpdateThreshold,
        Self::SpreadAdjustment,
        Self::TotalTradesOpen,
    ];

    /// Wire name used by the engine.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SimulationMode => "SIMULATION_MODE",
            Self::DryRun => "DRY_RUN",
            Self::DynamicPositionSizing => "DYNAMIC_POSITION_SIZING",
            Self::RiskRewardRatio => "RISK_REWARD_RATIO",
            Self::MaxPortfolioRisk => "MAX_PORTFOLIO_RISK",
            Self::Tp => "TP",
            Self::Sl => "SL",
            Self::Leverage => "LEVERAGE",
            Self::MaxTrades => "MAX_TRADES",
            Self::PairsToProcess => "PAIRS_TO_PROCESS",
            Self::Type => "TYPE",
            Self::SortBy => "SORTBY",
            Self::TradeFeeRate => "TRADE_FEE_RATE",
            Self::PriceUpdateThreshold => "PRICE_UPDATE_THRESHOLD",
            Self::SpreadAdjustment => "SPREAD_ADJUSTMENT",
            Self::TotalTradesOpen => "TOTAL_TRADES_OPEN",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SimulationMode => "Simulation Mode",
            Self::DryRun => "Dry Run",
            Self::DynamicPositionSizing => "Dynamic Position Sizing",
            Self::RiskRewardRatio => "Risk/Reward Ratio",
            Self::MaxPortfolioRisk => "Max Portfolio Risk",
            Self::Tp => "Take Profit (%)",
            Self::Sl => "Stop Loss (%)",
            Self::Leverage => "Leverage",
            Self::MaxTrades => "Max Trades",
            Self::PairsToProcess => "Pairs to Process",
            Self::Type => "Margin Type",
            Self::SortBy => "Sort By",
            Self::TradeFeeRate => "Trade Fee Rate",
            Self::PriceUpdateThreshold => "Price Update Threshold",
            Self::SpreadAdjustment => "Spread Adjustment",
            Self::TotalTradesOpen => "Total Trades Open (Read-only)",
        }
    }

    #[must_use]
    pub const fn group(self) -> ParamGroup {
        match self {
            Self::SimulationMode | Self::DryRun | Self::DynamicPositionSizing => {
                ParamGroup::TradingMode
            }
            Self::RiskRewardRatio | Self::MaxPortfolioRisk | Self::Tp | Self::Sl => {
                ParamGroup::RiskManagement
            }
            Self::Leverage | Self::MaxTrades | Self::PairsToProcess | Self::Type | Self::SortBy => {
                ParamGroup::TradingParameters
            }
            Self::TradeFeeRate
            | Self::PriceUpdateThreshold
            | Self::SpreadAdjustment
            | Self::TotalTradesOpen => ParamGroup::Advanced,
        }
    }

    #[must_use]
    pub const fn control(self) -> Control {
        match self {
            Self::SimulationMode | Self::DryRun | Self::DynamicPositionSizing => Control::Toggle,
            Self::RiskRewardRatio => Control::Slider {
                min: 1.0,
                max: 4.0,
                step: 0.1,
            },
            Self::MaxPortfolioRisk => Control::Slider {
                min: 0.1,
                max: 1.0,
                step: 0.1,
            },
            Self::Tp | Self::Sl => Control::Slider {
                min: 0.01,
                max: 1.0,
                step: 0.01,
            },
            Self::Leverage => Control::Slider {
                min: 1.0,
                max: 100.0,
                step: 1.0,
            },
            Self::MaxTrades => Control::Integer { min: 1, max: 50 },
            Self::PairsToProcess => Control::Integer { min: 0, max: 150 },
            Self::Type => Control::Choice(MARGIN_TYPE_OPTIONS),
            Self::SortBy => Control::Choice(SORT_BY_OPTIONS),
            Self::TradeFeeRate | Self::SpreadAdjustment => Control::Decimal { step: 0.0001 },
            Self::PriceUpdateThreshold => Control::Decimal { step: 0.001 },
            Self::TotalTradesOpen => Control::ReadOnly,
        }
    }

    /// Converts raw form or command-line input into the JSON value sent to the engine.
    ///
    /// # Errors
    ///
    /// Returns an error for read-only keys, unparsable input, values outside
    /// the control's bounds, and disabled choices.
    pub fn parse_value(self, raw: &str) -> Result<Value, ParamError> {
        let input = raw.trim();
        let key = self.as_str();
        let invalid = |reason: &str| ParamError::InvalidValue {
            key,
            input: input.to_string(),
            reason: reason.to_string(),
        };

        match self.control() {
            Control::ReadOnly => Err(ParamError::ReadOnly { key }),
            Control::Toggle => match input.to_ascii_lowercase().as_str() {
                "true" | "on" | "1" | "yes" => Ok(json!(true)),
                "false" | "off" | "0" | "no" => Ok(json!(false)),
                _ => Err(invalid("expected true or false")),
            },
            Control::Integer { min, max } => {
                let value: i64 = input.parse().map_err(|_| invalid("expected an integer"))?;
                if value < min || value > max {
                    return Err(ParamError::OutOfRange {
                        key,
                        min: min as f64,
                        max: max as f64,
                        value: value as f64,
                    });
                }
                Ok(json!(value))
            }
            Control::Slider { min, max, step } => {
                let value: f64 = input.parse().map_err(|_| invalid("expected a number"))?;
                if !value.is_finite() {
                    return Err(invalid("expected a finite number"));
                }
                // Tolerate float noise such as 0.30000000000000004.
                let eps = step / 1000.0;
                if value < min - eps || value > max + eps {
                    return Err(ParamError::OutOfRange {
                        key,
                        min,
                        max,
                        value,
                    });
                }
                if step.fract() == 0.0 {
                    if value.fract() != 0.0 {
                        return Err(invalid("expected a whole number"));
                    }
                    Ok(json!(value as i64))
                } else {
                    Ok(json!(value))
                }
            }
            Control::Decimal { .. } => {
                let value: f64 = input.parse().map_err(|_| invalid("expected a number"))?;
                if !value.is_finite() {
                    return Err(invalid("expected a finite number"));
                }
                Ok(json!(value))
            }
            Control::Choice(options) => {
                let option = options
                    .iter()
                    .find(|o| o.value.eq_ignore_ascii_case(input))
                    .ok_or_else(|| invalid("not one of the listed options"))?;
                if option.disabled {
                    return Err(ParamError::UnsupportedOption {
                        key,
                        option: option.value.to_string(),
                    });
                }
                Ok(json!(option.value))
            }
        }
    }

    /// Human-readable value as shown next to the control.
    #[must_use]
    pub fn format_display(self, config: &TradingConfig) -> String {
        match self {
            Self::Tp => format!("{:.1}%", config.tp * 100.0),
            Self::Sl => format!("{:.1}%", config.sl * 100.0),
            Self::Leverage => format!("{}x", config.leverage),
            _ => match config.value_of(self) {
                Value::String(s) => s,
                other => other.to_string(),
            },
        }
    }

    /// Moves a slider value by `steps` increments, clamped to its bounds.
    ///
    /// Returns `None` for keys that are not sliders.
    #[must_use]
    pub fn step_value(self, current: f64, steps: i32) -> Option<Value> {
        match self.control() {
            Control::Slider { min, max, step } => {
                let next = (current + f64::from(steps) * step).clamp(min, max);
                if step.fract() == 0.0 {
                    Some(json!(next.round() as i64))
                } else {
                    // Snap to the step grid to avoid accumulating float error.
                    let snapped = (next / step).round() * step;
                    let decimals = (-step.log10()).ceil().max(0.0) as i32;
                    let factor = 10f64.powi(decimals);
                    Some(json!((snapped * factor).round() / factor))
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParamError::UnknownKey(wanted.to_string()))
    }
}
