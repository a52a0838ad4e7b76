//! URL Uptime Monitor 主程序入口

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use url_uptime_monitor::cli::{create_command, Args, Commands};
use url_uptime_monitor::logging::{LogConfig, LoggingSystem};

#[tokio::main]
async fn main() -> Result<()> {
    // 先加载 .env，使网关等配置可以通过环境变量提供
    let dotenv = dotenvy::dotenv();

    let args = Args::parse_args();

    let log_config = LogConfig {
        level: args.log_level.into(),
        file_path: args.log_file.clone(),
        console: true,
        json_format: args.log_json,
        ..Default::default()
    };
    let _logging_system =
        LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    if let Ok(path) = dotenv {
        debug!("已加载环境变量文件: {}", path.display());
    }

    let command = args.effective_command();
    if command == Commands::Serve {
        info!("URL Uptime Monitor v{} 启动", url_uptime_monitor::VERSION);
    }

    if let Err(e) = create_command(&command).execute(&args).await {
        error!("命令执行失败: {}", e);
        eprintln!("{e}");
        std::process::exit(1);
    }

    Ok(())
}
