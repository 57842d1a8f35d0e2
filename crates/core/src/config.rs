use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base URL of the hosted trading engine the dashboard talks to.
pub const DEFAULT_ENGINE_URL: &str =
    "https://binancequanttradeengine-production-636e.up.railway.app";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Period between keep-alive `POST /start` calls while the engine runs.
    pub keepalive_interval_secs: u64,
}

impl EngineSettings {
    #[must_use]
    pub const fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            engine: EngineSettings {
                base_url: DEFAULT_ENGINE_URL.to_string(),
                timeout_secs: 30,
                keepalive_interval_secs: 10 * 60,
            },
        }
    }
}

impl AppConfig {
    /// Checks the values a loaded configuration cannot work without.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine URL is not http(s), or if the timeout or
    /// keep-alive interval is zero.
    pub fn validate(&self) -> Result<()> {
        let url = self.engine.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("engine.base_url must be an http(s) URL, got '{url}'");
        }
        if self.engine.timeout_secs == 0 {
            bail!("engine.timeout_secs must be greater than zero");
        }
        if self.engine.keepalive_interval_secs == 0 {
            bail!("engine.keepalive_interval_secs must be greater than zero");
        }
        Ok(())
    }
}
