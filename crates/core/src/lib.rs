pub mod config;
pub mod config_loader;
pub mod models;
pub mod params;

pub use config::{AppConfig, EngineSettings, ServerConfig, DEFAULT_ENGINE_URL};
pub use config_loader::ConfigLoader;
pub use models::{
    ConfigUpdate, EngineMessage, EngineStatus, ErrorDetail, MarginType, OrdersResponse,
    PositionsResponse, SortBy, TradingConfig,
};
pub use params::{ChoiceOption, ConfigKey, Control, ParamError, ParamGroup};
