//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{
    load_config, read_config, validate_config, validate_store_config, Config,
};
use crate::error::{ConfigError, Result};
use crate::health::{Checker, CronSchedule, CycleReport, CycleScheduler, HttpProbe, Scheduler};
use crate::notification::Notifier;
use crate::signal_handler::setup_signal_handlers;
use crate::store::{AddOutcome, DeleteOutcome, FileStore, MonitoredUrl, TIMESTAMP_FORMAT};
use crate::validation::NewRecord;
use crate::web::{AppState, WebServer};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 根据子命令创建处理器
pub fn create_command(command: &Commands) -> Box<dyn Command> {
    match command {
        Commands::Serve => Box::new(ServeCommand),
        Commands::Add { .. } => Box::new(AddCommand),
        Commands::Delete { .. } => Box::new(DeleteCommand),
        Commands::List { .. } => Box::new(ListCommand),
        Commands::Check { .. } => Box::new(CheckCommand),
    }
}

/// 加载配置并应用命令行覆盖项，做完整校验
pub async fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref()).await?;
    args.apply_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::ValidationError)?;
    Ok(config)
}

/// 只操作存储的命令使用的配置，仅校验存储路径
pub async fn resolve_store_config(args: &Args) -> Result<Config> {
    let mut config = read_config(args.config.as_deref()).await?;
    args.apply_overrides(&mut config);
    validate_store_config(&config).map_err(ConfigError::ValidationError)?;
    Ok(config)
}

/// 构建检测器，要求通知网关配置完整
fn build_checker(config: &Config, store: FileStore) -> Result<Checker> {
    let notifier = Notifier::from_config(config)?;
    let probe = HttpProbe::new(Duration::from_secs(config.schedule.request_timeout_seconds))?;
    Ok(Checker::new(store, Arc::new(probe), Arc::new(notifier)))
}

/// 服务命令：Web 界面加定时检测
pub struct ServeCommand;

#[async_trait]
impl Command for ServeCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let config = resolve_config(args).await?;
        let schedule = CronSchedule::parse(&config.schedule.cron)?;

        let store = FileStore::new(&config.store.path);
        // 网关配置不完整时直接退出，不触碰存储
        let checker = Arc::new(build_checker(&config, store.clone())?);

        // 启动时确认存储可读，不存在则创建
        let count = store.blocking(|store| store.list()).await?.len();
        info!(
            "存储文件: {}，当前记录数: {}",
            store.path().display(),
            count
        );

        let scheduler = CycleScheduler::new(checker, schedule);

        let (shutdown_tx, _) = broadcast::channel(4);
        setup_signal_handlers(shutdown_tx.clone()).await?;

        scheduler.start().await?;

        let state = AppState::new(store, config.web.clone(), config.schedule.cron.clone());
        let result = WebServer::new(state, shutdown_tx.subscribe()).run().await;

        scheduler.stop().await?;
        let status = scheduler.get_status().await;
        info!(
            cycles_run = status.cycles_run,
            cycles_skipped = status.cycles_skipped,
            cycles_failed = status.cycles_failed,
            notifications_sent = status.notification_stats.successful_sent,
            notifications_failed = status.notification_stats.failed_sent,
            "服务已停止"
        );

        result
    }
}

/// 添加命令
pub struct AddCommand;

#[async_trait]
impl Command for AddCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Add { url, mobile, email } = args.effective_command() else {
            return Ok(());
        };

        let config = resolve_store_config(args).await?;
        let record = NewRecord::parse(&url, &mobile, &email)?;
        let store = FileStore::new(&config.store.path);

        match store.blocking(move |store| store.add(record)).await? {
            AddOutcome::Added => println!("URL added successfully"),
            AddOutcome::AlreadyExists => println!("URL already exists: {url}"),
        }
        Ok(())
    }
}

/// 删除命令
pub struct DeleteCommand;

#[async_trait]
impl Command for DeleteCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Delete { url } = args.effective_command() else {
            return Ok(());
        };

        let config = resolve_store_config(args).await?;
        let store = FileStore::new(&config.store.path);
        let target = url.clone();

        match store.blocking(move |store| store.delete(&target)).await? {
            DeleteOutcome::Deleted => println!("URL deleted successfully"),
            DeleteOutcome::NotFound => println!("URL not found: {url}"),
        }
        Ok(())
    }
}

/// 列表命令
pub struct ListCommand;

#[async_trait]
impl Command for ListCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::List { format } = args.effective_command() else {
            return Ok(());
        };

        let config = resolve_store_config(args).await?;
        let store = FileStore::new(&config.store.path);
        let records = store.blocking(|store| store.list()).await?;

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
            OutputFormat::Text => print_records(&records),
        }
        Ok(())
    }
}

fn print_records(records: &[MonitoredUrl]) {
    if records.is_empty() {
        println!("没有监控中的 URL");
        return;
    }

    println!(
        "{:<40} {:<18} {:<30} {:<14} {:<19}",
        "URL", "MOBILE", "EMAIL", "LAST STATUS", "LAST CHECKED (UTC)"
    );
    for record in records {
        let status = record
            .last_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "Not checked yet".to_string());
        let time = record
            .last_time
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| "Not checked yet".to_string());
        println!(
            "{:<40} {:<18} {:<30} {:<14} {:<19}",
            record.url, record.mobile, record.email, status, time
        );
    }
}

/// 一次性检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Check { format } = args.effective_command() else {
            return Ok(());
        };

        let config = resolve_config(args).await?;
        let store = FileStore::new(&config.store.path);
        let checker = build_checker(&config, store)?;
        let report = checker.run_cycle().await?;

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_report(&report),
        }

        if report.notification_stats.failed_sent > 0 {
            warn!("{} 条告警发送失败", report.notification_stats.failed_sent);
        }
        Ok(())
    }
}

fn print_report(report: &CycleReport) {
    println!(
        "检测周期 {} @ {} UTC",
        report.cycle_id,
        report.timestamp.format(TIMESTAMP_FORMAT)
    );
    for outcome in &report.outcomes {
        let detail = outcome.error_message.as_deref().unwrap_or("");
        println!(
            "{:<14} {:>6}ms  {} {}",
            outcome.status.to_string(),
            outcome.response_time_ms,
            outcome.url,
            detail
        );
    }
    println!(
        "共 {} 个，可达 {}，不可达 {}；告警成功 {}，失败 {}",
        report.checked(),
        report.accessible,
        report.inaccessible,
        report.notification_stats.successful_sent,
        report.notification_stats.failed_sent
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;
    use tempfile::TempDir;

    fn args(dir: &TempDir, rest: &[&str]) -> Args {
        let store = dir.path().join("urls.json");
        let config = dir.path().join("conf").join("monitor.toml");
        let mut argv = vec![
            "url-uptime-monitor".to_string(),
            "--store".to_string(),
            store.display().to_string(),
        ];
        // 空配置文件，避免读取当前目录或用户目录下的配置
        std::fs::create_dir_all(config.parent().unwrap()).unwrap();
        std::fs::write(&config, "").unwrap();
        argv.push("--config".to_string());
        argv.push(config.display().to_string());
        argv.extend(rest.iter().map(|s| s.to_string()));
        Args::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn test_add_then_delete_via_commands() {
        let dir = TempDir::new().unwrap();

        let add = args(
            &dir,
            &["add", "-u", "https://a.test", "-m", "+1 202 555 0100", "-e", "a@test.com"],
        );
        create_command(&add.effective_command())
            .execute(&add)
            .await
            .unwrap();

        let store = FileStore::new(dir.path().join("urls.json"));
        assert_eq!(store.load().unwrap().len(), 1);

        let delete = args(&dir, &["delete", "-u", "https://a.test"]);
        create_command(&delete.effective_command())
            .execute(&delete)
            .await
            .unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_add_rejects_invalid_input() {
        let dir = TempDir::new().unwrap();
        let add = args(
            &dir,
            &["add", "-u", "not a url", "-m", "+1 202 555 0100", "-e", "a@test.com"],
        );

        let result = AddCommand.execute(&add).await;
        assert!(matches!(
            result,
            Err(crate::error::MonitorError::Validation(_))
        ));
        assert!(!dir.path().join("urls.json").exists());
    }

    const GATEWAY_ENV_VARS: [&str; 12] = [
        "SMS_NOTIFICATION_ENDPOINT",
        "SMS_NOTIFICATION_USERNAME",
        "SMS_NOTIFICATION_KEY",
        "SMS_NOTIFICATION_TYPE",
        "SMS_NOTIFICATION_CHANNEL",
        "SMS_NOTIFICATION_FROM",
        "EMAIL_NOTIFICATION_ENDPOINT",
        "EMAIL_NOTIFICATION_USERNAME",
        "EMAIL_NOTIFICATION_KEY",
        "EMAIL_NOTIFICATION_TYPE",
        "EMAIL_NOTIFICATION_CHANNEL",
        "EMAIL_NOTIFICATION_FROM",
    ];

    fn clear_gateway_env() {
        for var in GATEWAY_ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_store_commands_ignore_unrelated_config() {
        let dir = TempDir::new().unwrap();
        clear_gateway_env();
        std::env::set_var("SMS_NOTIFICATION_ENDPOINT", "sms.gateway.test/send");

        let add = args(
            &dir,
            &[
                "--schedule",
                "every minute",
                "add",
                "-u",
                "https://a.test",
                "-m",
                "+1 202 555 0100",
                "-e",
                "a@test.com",
            ],
        );
        let added = AddCommand.execute(&add).await;

        let list = args(&dir, &["--schedule", "every minute", "list"]);
        let listed = ListCommand.execute(&list).await;

        let delete = args(&dir, &["delete", "-u", "https://a.test"]);
        let deleted = DeleteCommand.execute(&delete).await;

        // 同样的配置对需要网关的命令仍然是错误
        let check = args(&dir, &["check"]);
        let checked = CheckCommand.execute(&check).await;

        clear_gateway_env();

        assert!(added.is_ok(), "add 失败: {added:?}");
        assert!(listed.is_ok(), "list 失败: {listed:?}");
        assert!(deleted.is_ok(), "delete 失败: {deleted:?}");
        assert!(matches!(
            checked,
            Err(crate::error::MonitorError::Config(
                ConfigError::ValidationError(_)
            ))
        ));
        assert!(FileStore::new(dir.path().join("urls.json"))
            .load()
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_serve_without_gateways_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        clear_gateway_env();
        let serve = args(&dir, &["--port", "3999", "serve"]);

        let result = ServeCommand.execute(&serve).await;
        assert!(matches!(
            result,
            Err(crate::error::MonitorError::Config(
                ConfigError::MissingGatewayField { .. }
            ))
        ));
        assert!(!dir.path().join("urls.json").exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_list_does_not_require_gateways() {
        let dir = TempDir::new().unwrap();
        let list = args(&dir, &["list", "--format", "json"]);
        assert!(ListCommand.execute(&list).await.is_ok());
    }

    #[tokio::test]
    #[serial]
    async fn test_check_requires_gateways() {
        let dir = TempDir::new().unwrap();
        clear_gateway_env();
        let check = args(&dir, &["check"]);

        let result = CheckCommand.execute(&check).await;
        assert!(matches!(
            result,
            Err(crate::error::MonitorError::Config(
                ConfigError::MissingGatewayField { .. }
            ))
        ));
    }
}
