//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config::Config;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// URL Uptime Monitor - 定时检测 URL 可达性并发送短信/邮件告警
#[derive(Parser, Debug, Clone)]
#[command(
    name = "url-uptime-monitor",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "URL_MONITOR_CONFIG",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// 存储文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "JSON 存储文件路径",
        env = "URL_MONITOR_STORE",
        global = true
    )]
    pub store: Option<PathBuf>,

    /// 日志级别
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        help = "日志级别",
        env = "URL_MONITOR_LOG_LEVEL",
        global = true
    )]
    pub log_level: LogLevel,

    /// 以 JSON 格式输出日志
    #[arg(long, help = "以 JSON 格式输出日志", env = "URL_MONITOR_LOG_JSON", global = true)]
    pub log_json: bool,

    /// 日志文件路径
    #[arg(
        long,
        value_name = "FILE",
        help = "同时写入日志文件",
        env = "URL_MONITOR_LOG_FILE",
        global = true
    )]
    pub log_file: Option<PathBuf>,

    /// 检测调度表达式
    #[arg(
        long,
        value_name = "CRON",
        help = "五段式 cron 调度表达式（UTC）",
        env = "URL_MONITOR_SCHEDULE",
        global = true
    )]
    pub schedule: Option<String>,

    /// Web 服务绑定地址
    #[arg(
        long,
        value_name = "ADDR",
        help = "Web 服务绑定地址",
        env = "URL_MONITOR_BIND",
        global = true
    )]
    pub bind: Option<String>,

    /// Web 服务端口
    #[arg(
        short,
        long,
        value_name = "PORT",
        help = "Web 服务端口",
        env = "URL_MONITOR_PORT",
        global = true
    )]
    pub port: Option<u16>,

    /// 子命令，缺省为 serve
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// 启动 Web 服务和定时检测
    Serve,

    /// 添加要监控的 URL
    Add {
        /// 要监控的 URL
        #[arg(short, long, help = "要监控的 URL")]
        url: String,

        /// 短信通知号码
        #[arg(short, long, help = "短信通知号码")]
        mobile: String,

        /// 邮件通知地址，多个用逗号分隔
        #[arg(short, long, help = "邮件通知地址，多个用逗号分隔")]
        email: String,
    },

    /// 删除监控的 URL
    Delete {
        /// 要删除的 URL
        #[arg(short, long, help = "要删除的 URL")]
        url: String,
    },

    /// 列出所有监控的 URL
    List {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 立即执行一次检测
    Check {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 要执行的子命令，未指定时为 serve
    pub fn effective_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }

    /// 把命令行覆盖项写入配置
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(store) = &self.store {
            config.store.path = store.clone();
        }
        if let Some(schedule) = &self.schedule {
            config.schedule.cron = schedule.clone();
        }
        if let Some(bind) = &self.bind {
            config.web.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.web.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_serve() {
        let args = Args::try_parse_from(["url-uptime-monitor"]).unwrap();
        assert_eq!(args.effective_command(), Commands::Serve);
    }

    #[test]
    fn test_add_command() {
        let args = Args::try_parse_from([
            "url-uptime-monitor",
            "add",
            "-u",
            "https://a.test",
            "-m",
            "+1 202 555 0100",
            "-e",
            "a@test.com",
        ])
        .unwrap();

        assert_eq!(
            args.effective_command(),
            Commands::Add {
                url: "https://a.test".to_string(),
                mobile: "+1 202 555 0100".to_string(),
                email: "a@test.com".to_string(),
            }
        );
    }

    #[test]
    fn test_add_requires_all_fields() {
        let result = Args::try_parse_from(["url-uptime-monitor", "add", "-u", "https://a.test"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_list_json_format() {
        let args =
            Args::try_parse_from(["url-uptime-monitor", "list", "--format", "json"]).unwrap();
        assert_eq!(
            args.effective_command(),
            Commands::List {
                format: OutputFormat::Json
            }
        );
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let args = Args::try_parse_from([
            "url-uptime-monitor",
            "--store",
            "/tmp/urls.json",
            "--schedule",
            "*/5 * * * *",
            "--bind",
            "127.0.0.1",
            "--port",
            "8080",
            "serve",
        ])
        .unwrap();

        let mut config = Config::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.store.path, PathBuf::from("/tmp/urls.json"));
        assert_eq!(config.schedule.cron, "*/5 * * * *");
        assert_eq!(config.web.bind_address, "127.0.0.1");
        assert_eq!(config.web.port, 8080);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }
}
