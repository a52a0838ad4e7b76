//! 配置管理模块
//!
//! 提供配置文件解析、环境变量加载和验证功能

pub mod loader;
pub mod types;

// 重新导出主要类型
pub use loader::{load_config, read_config, ConfigLoader, TomlConfigLoader};
pub use types::{
    validate_config, validate_store_config, Config, GatewayConfig, NotificationConfig,
    ScheduleConfig, StoreConfig, WebConfig,
};
