//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use std::path::PathBuf;
use thiserror::Error;

/// URL 监控应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum MonitorError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 存储相关错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    /// 输入校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),

    /// 通知相关错误
    #[error("通知错误: {0}")]
    Notification(#[from] NotificationError),

    /// 探测相关错误
    #[error("探测错误: {0}")]
    Probe(#[from] ProbeError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },

    /// 通知网关配置缺失
    #[error("通知网关配置缺失: {field} (环境变量 {env_var})")]
    MissingGatewayField { field: String, env_var: String },

    /// cron 表达式无效
    #[error("无效的调度表达式 '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },
}

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 读写存储文件失败
    #[error("读写存储文件失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 存储文件内容损坏
    #[error("存储文件内容无法解析 {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// 序列化失败
    #[error("序列化存储内容失败: {0}")]
    Serialize(#[source] serde_json::Error),

    /// 获取文件锁失败
    #[error("获取存储文件锁失败 {path}: {reason}")]
    Lock { path: PathBuf, reason: String },

    /// 后台任务异常退出
    #[error("存储任务执行失败: {0}")]
    Task(String),
}

/// 输入校验错误类型
///
/// 显示文本即返回给调用方的提示信息
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// URL 格式无效
    #[error("Invalid URL")]
    InvalidUrl(String),

    /// 手机号格式无效
    #[error("Invalid mobile number")]
    InvalidMobile(String),

    /// 邮箱格式无效，携带第一个无效的地址
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}

impl ValidationError {
    /// 校验失败的字段名
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidUrl(_) => "url",
            ValidationError::InvalidMobile(_) => "mobile",
            ValidationError::InvalidEmail(_) => "email",
        }
    }
}

/// 通知错误类型
#[derive(Error, Debug)]
pub enum NotificationError {
    /// 请求未能送达网关
    #[error("通知发送失败: {0}")]
    SendError(String),

    /// 网关返回非 2xx 状态码
    #[error("通知网关拒绝请求: HTTP {status} {body}")]
    Rejected { status: u16, body: String },

    /// 模板渲染错误
    #[error("模板渲染失败: {0}")]
    TemplateError(String),

    /// 配置错误
    #[error("通知配置错误: {0}")]
    ConfigError(String),
}

/// 探测错误类型
#[derive(Error, Debug)]
pub enum ProbeError {
    /// HTTP客户端创建失败
    #[error("创建HTTP客户端失败: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, MonitorError>;
