//! Askama page models.
//!
//! Templates only see plain strings, numbers and flags; everything that
//! depends on the parameter catalogue is resolved here.

use askama::Template;
use quantbot_controller::{DashboardView, NoticeLevel};
use quantbot_core::{ConfigKey, Control, ParamGroup, TradingConfig};
use serde_json::Value;

/// Tab selected on the dashboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Config,
    Positions,
    Orders,
}

impl Tab {
    /// Unknown or missing names fall back to the configuration tab.
    #[must_use]
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(str::to_ascii_lowercase).as_deref() {
            Some("positions") => Self::Positions,
            Some("orders") => Self::Orders,
            _ => Self::Config,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Positions => "positions",
            Self::Orders => "orders",
        }
    }
}

#[derive(Template)]
#[template(path = "landing.html")]
pub struct LandingPage {
    /// (title, description)
    pub features: Vec<(&'static str, &'static str)>,
}

impl LandingPage {
    #[must_use]
    pub fn new() -> Self {
        Self {
            features: vec![
                (
                    "Live Configuration",
                    "Adjust leverage, risk and trade limits while the bot runs",
                ),
                (
                    "Run Control",
                    "Start and stop the engine with a keep-alive while it trades",
                ),
                (
                    "Positions and Orders",
                    "Inspect open positions and recent orders as the engine reports them",
                ),
                (
                    "One-off Actions",
                    "Refresh market data or run the strategy on demand",
                ),
            ],
        }
    }
}

impl Default for LandingPage {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Template)]
#[template(path = "loading.html")]
pub struct LoadingPage {
    pub notice: String,
}

impl LoadingPage {
    #[must_use]
    pub fn from_view(view: &DashboardView) -> Self {
        Self {
            notice: view
                .notice
                .as_ref()
                .map(|n| n.text.clone())
                .unwrap_or_default(),
        }
    }
}

pub struct ChoiceRow {
    pub value: &'static str,
    pub label: &'static str,
    pub disabled: bool,
    pub selected: bool,
}

/// One parameter form on the configuration tab.
pub struct ParamRow {
    pub key: &'static str,
    pub label: &'static str,
    /// "toggle", "slider", "number", "choice" or "readonly".
    pub kind: &'static str,
    pub display: String,
    /// Current value as form input text.
    pub value: String,
    pub checked: bool,
    /// Value submitted by a toggle button.
    pub toggled: &'static str,
    pub min: String,
    pub max: String,
    pub step: String,
    pub options: Vec<ChoiceRow>,
}

impl ParamRow {
    fn new(key: ConfigKey, config: &TradingConfig) -> Self {
        let current = config.value_of(key);
        let value = match &current {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let checked = current.as_bool().unwrap_or(false);

        let mut row = Self {
            key: key.as_str(),
            label: key.label(),
            kind: "readonly",
            display: key.format_display(config),
            value,
            checked,
            toggled: if checked { "false" } else { "true" },
            min: String::new(),
            max: String::new(),
            step: String::new(),
            options: Vec::new(),
        };

        match key.control() {
            Control::Toggle => row.kind = "toggle",
            Control::Slider { min, max, step } => {
                row.kind = "slider";
                row.min = min.to_string();
                row.max = max.to_string();
                row.step = step.to_string();
            }
            Control::Integer { min, max } => {
                row.kind = "number";
                row.min = min.to_string();
                row.max = max.to_string();
                row.step = "1".to_string();
            }
            Control::Decimal { step } => {
                row.kind = "number";
                row.step = step.to_string();
            }
            Control::Choice(options) => {
                row.kind = "choice";
                row.options = options
                    .iter()
                    .map(|o| ChoiceRow {
                        value: o.value,
                        label: o.label,
                        disabled: o.disabled,
                        selected: o.value.eq_ignore_ascii_case(&row.value),
                    })
                    .collect();
            }
            Control::ReadOnly => {}
        }
        row
    }
}

pub struct GroupSection {
    pub title: &'static str,
    pub description: &'static str,
    pub rows: Vec<ParamRow>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub tab: &'static str,
    pub running: bool,
    pub notice: String,
    pub notice_class: &'static str,
    pub run_count: u64,
    pub open_trades: u64,
    pub max_trades: i64,
    pub keepalive_active: bool,
    pub last_refreshed: String,
    pub groups: Vec<GroupSection>,
    pub positions: Vec<String>,
    pub orders: Vec<String>,
}

impl DashboardPage {
    /// Builds the page from a ready view. Missing parts render as defaults.
    #[must_use]
    pub fn from_view(view: &DashboardView, tab: Tab) -> Self {
        let config = view.config.clone().unwrap_or_default();
        let status = view.status.unwrap_or_default();

        let (notice, notice_class) = match &view.notice {
            Some(n) => (
                n.text.clone(),
                match n.level {
                    NoticeLevel::Success => "success",
                    NoticeLevel::Error => "error",
                },
            ),
            None => (String::new(), ""),
        };

        let groups = ParamGroup::ALL
            .into_iter()
            .map(|group| GroupSection {
                title: group.title(),
                description: group.description(),
                rows: group.keys().map(|k| ParamRow::new(k, &config)).collect(),
            })
            .collect();

        Self {
            tab: tab.as_str(),
            running: status.running,
            notice,
            notice_class,
            run_count: status.run_count,
            open_trades: status.total_trades_open,
            max_trades: config.max_trades,
            keepalive_active: view.keepalive_active,
            last_refreshed: view
                .last_refreshed
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_default(),
            groups,
            positions: view.positions.iter().map(pretty).collect(),
            orders: view.orders.iter().map(pretty).collect(),
        }
    }
}

fn pretty(record: &Value) -> String {
    serde_json::to_string_pretty(record).unwrap_or_else(|_| record.to_string())
}
