//! URL Uptime Monitor - 定时检测 URL 可达性的监控工具
//!
//! 这是一个用Rust编写的 URL 可用性监控工具，支持：
//! - 按 cron 表达式定时探测 URL（仅 HTTP 200 视为可达）
//! - 不可达时通过短信和邮件网关发送告警
//! - JSON 文件存储，Web 页面与命令行共享
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod notification;
pub mod signal_handler;
pub mod store;
pub mod validation;
pub mod web;

// 重新导出主要类型
pub use config::Config;
pub use error::MonitorError;
pub use health::{Checker, CronSchedule, CycleScheduler, HttpProbe};
pub use store::{FileStore, MonitoredUrl, UrlStatus};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
