//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::error::ConfigError;
use crate::health::schedule::CronSchedule;
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

/// 主配置结构，启动时构建一次并显式传递给各组件
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 存储配置
    #[serde(default)]
    pub store: StoreConfig,
    /// 调度配置
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Web 服务器配置
    #[serde(default)]
    pub web: WebConfig,
    /// 通知配置
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// JSON 存储文件路径
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// 调度配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    /// 五段式 cron 表达式
    #[serde(default = "default_cron")]
    pub cron: String,
    /// 探测请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            request_timeout_seconds: default_timeout(),
        }
    }
}

/// Web 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebConfig {
    /// 绑定地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 页面自动刷新间隔（秒）
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u32,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            refresh_interval_seconds: default_refresh_interval(),
        }
    }
}

impl WebConfig {
    /// 解析监听地址
    ///
    /// 绑定地址可以是 IPv4、IPv6 或主机名，例如 `0.0.0.0`、`::`、`localhost`
    pub fn listen_addrs(&self) -> Result<Vec<SocketAddr>, ConfigError> {
        let invalid = |reason: String| {
            ConfigError::ValidationError(format!(
                "无效的监听地址 {} (端口 {}): {}",
                self.bind_address, self.port, reason
            ))
        };

        let addrs: Vec<SocketAddr> = (self.bind_address.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| invalid(e.to_string()))?
            .collect();

        if addrs.is_empty() {
            return Err(invalid("未解析到任何地址".to_string()));
        }
        Ok(addrs)
    }
}

/// 通知配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    /// 告警消息模板（handlebars 语法，可用变量 `url`、`mobile`、`email`）
    #[serde(default = "default_message_template")]
    pub message_template: String,
    /// 网关活动名称
    #[serde(default = "default_campaign")]
    pub campaign: String,
    /// 网关请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// 短信网关
    pub sms: Option<GatewayConfig>,
    /// 邮件网关
    pub email: Option<GatewayConfig>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            message_template: default_message_template(),
            campaign: default_campaign(),
            timeout_seconds: default_timeout(),
            sms: None,
            email: None,
        }
    }
}

/// 通知网关配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    /// 网关地址
    #[serde(default)]
    pub endpoint: String,
    /// 项目名（表单字段 `project`）
    #[serde(default)]
    pub username: String,
    /// API 密钥
    #[serde(default)]
    pub api_key: String,
    /// 消息类型（表单字段 `type`）
    #[serde(default)]
    pub message_type: String,
    /// 发送渠道
    #[serde(default)]
    pub channel: String,
    /// 发送方标识
    #[serde(default)]
    pub from: String,
}

/// 网关字段名与环境变量后缀的对应关系
const GATEWAY_FIELDS: [(&str, &str); 6] = [
    ("endpoint", "ENDPOINT"),
    ("username", "USERNAME"),
    ("api_key", "KEY"),
    ("message_type", "TYPE"),
    ("channel", "CHANNEL"),
    ("from", "FROM"),
];

impl GatewayConfig {
    /// 从环境变量读取网关配置
    ///
    /// # 参数
    /// * `prefix` - 环境变量前缀，如 `SMS`、`EMAIL`
    ///
    /// # 返回
    /// * `Option<Self>` - 所有变量都未设置时返回 None
    pub fn from_env(prefix: &str) -> Option<Self> {
        let mut config = GatewayConfig::default();
        let mut any_set = false;

        for (field, suffix) in GATEWAY_FIELDS {
            if let Ok(value) = std::env::var(gateway_env_var(prefix, suffix)) {
                any_set = true;
                *config.field_mut(field) = value;
            }
        }

        any_set.then_some(config)
    }

    /// 返回第一个为空的字段名
    pub fn first_missing_field(&self) -> Option<(&'static str, &'static str)> {
        GATEWAY_FIELDS
            .iter()
            .copied()
            .find(|(field, _)| self.field(field).trim().is_empty())
    }

    fn field(&self, name: &str) -> &str {
        match name {
            "endpoint" => &self.endpoint,
            "username" => &self.username,
            "api_key" => &self.api_key,
            "message_type" => &self.message_type,
            "channel" => &self.channel,
            _ => &self.from,
        }
    }

    fn field_mut(&mut self, name: &str) -> &mut String {
        match name {
            "endpoint" => &mut self.endpoint,
            "username" => &mut self.username,
            "api_key" => &mut self.api_key,
            "message_type" => &mut self.message_type,
            "channel" => &mut self.channel,
            _ => &mut self.from,
        }
    }
}

fn gateway_env_var(prefix: &str, suffix: &str) -> String {
    format!("{prefix}_NOTIFICATION_{suffix}")
}

impl Config {
    /// 从环境变量构建配置（网关部分），其余字段使用默认值
    pub fn from_env() -> Self {
        Self {
            notification: NotificationConfig {
                sms: GatewayConfig::from_env("SMS"),
                email: GatewayConfig::from_env("EMAIL"),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// 取出完整的短信与邮件网关配置
    ///
    /// 启动检测服务前调用，任何缺失字段都是致命错误
    pub fn required_gateways(&self) -> Result<(&GatewayConfig, &GatewayConfig), ConfigError> {
        let sms = require_gateway("sms", "SMS", self.notification.sms.as_ref())?;
        let email = require_gateway("email", "EMAIL", self.notification.email.as_ref())?;
        Ok((sms, email))
    }
}

fn require_gateway<'a>(
    section: &str,
    prefix: &str,
    gateway: Option<&'a GatewayConfig>,
) -> Result<&'a GatewayConfig, ConfigError> {
    let missing = |(field, suffix): (&str, &str)| ConfigError::MissingGatewayField {
        field: format!("{section}.{field}"),
        env_var: gateway_env_var(prefix, suffix),
    };

    let Some(gateway) = gateway else {
        return Err(missing(GATEWAY_FIELDS[0]));
    };

    match gateway.first_missing_field() {
        Some(field) => Err(missing(field)),
        None => Ok(gateway),
    }
}

// 默认值函数
fn default_store_path() -> PathBuf {
    PathBuf::from("./urls.json")
}
fn default_cron() -> String {
    "* * * * *".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_refresh_interval() -> u32 {
    60
}
fn default_message_template() -> String {
    "{{url}} is not reachable".to_string()
}
fn default_campaign() -> String {
    "URL Uptime Monitoring".to_string()
}

/// 只校验存储相关配置
///
/// `add`、`delete`、`list` 只访问存储，不受调度、Web 和网关配置影响
pub fn validate_store_config(config: &Config) -> Result<(), String> {
    if config.store.path.as_os_str().is_empty() {
        return Err("存储文件路径不能为空".to_string());
    }
    Ok(())
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    validate_store_config(config)?;

    if let Err(e) = CronSchedule::parse(&config.schedule.cron) {
        return Err(e.to_string());
    }

    if config.schedule.request_timeout_seconds == 0 {
        return Err("探测超时时间不能为0".to_string());
    }

    if config.notification.timeout_seconds == 0 {
        return Err("通知超时时间不能为0".to_string());
    }

    if config.notification.message_template.trim().is_empty() {
        return Err("告警消息模板不能为空".to_string());
    }

    // 验证Web配置
    if config.web.port == 0 {
        return Err("Web服务器端口不能为0".to_string());
    }

    if config.web.bind_address.is_empty() {
        return Err("Web服务器绑定地址不能为空".to_string());
    }

    if config.web.refresh_interval_seconds == 0 {
        return Err("Web界面刷新间隔不能为0秒".to_string());
    }

    if config.web.refresh_interval_seconds > 300 {
        return Err("Web界面刷新间隔不能超过300秒".to_string());
    }

    // 已配置的网关地址必须是 http(s)
    for (section, gateway) in [
        ("sms", &config.notification.sms),
        ("email", &config.notification.email),
    ] {
        if let Some(gateway) = gateway {
            if !gateway.endpoint.is_empty()
                && !gateway.endpoint.starts_with("http://")
                && !gateway.endpoint.starts_with("https://")
            {
                return Err(format!("{section} 网关地址格式无效: {}", gateway.endpoint));
            }
        }
    }

    Ok(())
}
