use chrono::{DateTime, Utc};
use quantbot_core::{EngineStatus, TradingConfig};
use serde::Serialize;
use serde_json::Value;

/// Transient dashboard state. Every engine model is replaced wholesale on each fetch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub config: Option<TradingConfig>,
    pub status: Option<EngineStatus>,
    pub positions: Vec<Value>,
    pub orders: Vec<Value>,
    /// A start/stop/action request is in flight.
    pub loading: bool,
    pub notice: Option<Notice>,
    pub keepalive_active: bool,
    /// Last time all four reads succeeded.
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl DashboardView {
    /// Both config and status have been loaded at least once.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.config.is_some() && self.status.is_some()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status.is_some_and(|s| s.running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// One-line message shown above the dashboard after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}
