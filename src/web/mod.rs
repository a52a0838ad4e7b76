//! Web界面模块
//!
//! 提供状态页、表单提交和 JSON 接口

use crate::config::WebConfig;
use crate::store::FileStore;

pub mod handlers;
pub mod server;

pub use server::{router, WebServer};

/// Web 处理函数共享的状态
#[derive(Debug, Clone)]
pub struct AppState {
    /// 记录存储
    pub store: FileStore,
    /// Web 配置
    pub config: WebConfig,
    /// 页面上展示的调度表达式
    pub schedule: String,
}

impl AppState {
    /// 创建新的共享状态
    pub fn new(store: FileStore, config: WebConfig, schedule: impl Into<String>) -> Self {
        Self {
            store,
            config,
            schedule: schedule.into(),
        }
    }
}
