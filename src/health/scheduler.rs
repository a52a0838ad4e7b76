//! 任务调度器模块
//!
//! 按 cron 表达式触发检测周期。同一时刻最多只有一个周期在运行，
//! 上一个周期未结束时到来的触发会被跳过并计数。

use crate::health::checker::{Checker, CycleReport, NotificationStats};
use crate::health::schedule::CronSchedule;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// 停止时等待进行中周期结束的最长时间
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// 调度器状态
#[derive(Debug, Clone, Default)]
pub struct SchedulerStatus {
    /// 调度器是否运行中
    pub is_running: bool,
    /// 是否有周期正在执行
    pub cycle_in_progress: bool,
    /// 已完成的周期数
    pub cycles_run: u64,
    /// 因上一周期未结束而跳过的触发次数
    pub cycles_skipped: u64,
    /// 因存储错误失败的周期数
    pub cycles_failed: u64,
    /// 最近一次完成的周期标识
    pub last_cycle_id: Option<Uuid>,
    /// 最近一次完成的周期时间
    pub last_cycle_at: Option<NaiveDateTime>,
    /// 下一次触发时间
    pub next_run: Option<DateTime<Utc>>,
    /// 累计通知统计
    pub notification_stats: NotificationStats,
}

/// 任务调度器trait，定义调度接口
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// 启动调度器
    ///
    /// # 返回
    /// * `Result<()>` - 启动结果
    async fn start(&self) -> Result<()>;

    /// 停止调度器
    ///
    /// # 返回
    /// * `Result<()>` - 停止结果
    async fn stop(&self) -> Result<()>;

    /// 获取调度器状态
    ///
    /// # 返回
    /// * `SchedulerStatus` - 当前状态
    async fn get_status(&self) -> SchedulerStatus;
}

/// 基于 cron 的单飞调度器
pub struct CycleScheduler {
    /// 检测器
    checker: Arc<Checker>,
    /// 触发时间表
    schedule: CronSchedule,
    /// 单飞保护，持有期间表示有周期在运行
    cycle_guard: Arc<Mutex<()>>,
    /// 调度器状态
    status: Arc<RwLock<SchedulerStatus>>,
    /// 调度循环任务
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CycleScheduler {
    /// 创建新的调度器
    ///
    /// # 参数
    /// * `checker` - 检测器
    /// * `schedule` - cron 触发时间表
    pub fn new(checker: Arc<Checker>, schedule: CronSchedule) -> Self {
        Self {
            checker,
            schedule,
            cycle_guard: Arc::new(Mutex::new(())),
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
            task: Mutex::new(None),
        }
    }

    /// 立即触发一次周期
    ///
    /// # 返回
    /// * `Option<JoinHandle<()>>` - 周期任务句柄；上一个周期尚未结束时跳过并返回 None
    #[cfg(test)]
    pub(crate) async fn trigger(&self) -> Option<JoinHandle<()>> {
        Self::spawn_cycle(
            Arc::clone(&self.checker),
            Arc::clone(&self.cycle_guard),
            Arc::clone(&self.status),
        )
        .await
    }

    async fn spawn_cycle(
        checker: Arc<Checker>,
        cycle_guard: Arc<Mutex<()>>,
        status: Arc<RwLock<SchedulerStatus>>,
    ) -> Option<JoinHandle<()>> {
        let permit = match cycle_guard.try_lock_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("上一个检测周期仍在运行，跳过本次触发");
                status.write().await.cycles_skipped += 1;
                return None;
            }
        };

        status.write().await.cycle_in_progress = true;

        Some(tokio::spawn(async move {
            let _permit = permit;
            let result = checker.run_cycle().await;

            let mut status = status.write().await;
            status.cycle_in_progress = false;
            match result {
                Ok(report) => Self::record_cycle(&mut status, &report),
                Err(e) => {
                    error!("检测周期失败，本次结果未写回: {}", e);
                    status.cycles_failed += 1;
                }
            }
        }))
    }

    fn record_cycle(status: &mut SchedulerStatus, report: &CycleReport) {
        status.cycles_run += 1;
        status.last_cycle_id = Some(report.cycle_id);
        status.last_cycle_at = Some(report.timestamp);

        let stats = &mut status.notification_stats;
        stats.total_sent += report.notification_stats.total_sent;
        stats.successful_sent += report.notification_stats.successful_sent;
        stats.failed_sent += report.notification_stats.failed_sent;
    }
}

#[async_trait]
impl Scheduler for CycleScheduler {
    async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            warn!("调度器已在运行");
            return Ok(());
        }

        info!("启动任务调度器，调度表达式: {}", self.schedule);
        self.status.write().await.is_running = true;

        let checker = Arc::clone(&self.checker);
        let schedule = self.schedule.clone();
        let cycle_guard = Arc::clone(&self.cycle_guard);
        let status = Arc::clone(&self.status);

        *task = Some(tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let Some(next) = schedule.next_after(now) else {
                    warn!("调度表达式 {} 不会再触发，调度循环退出", schedule);
                    break;
                };
                status.write().await.next_run = Some(next);

                let wait = (next - now).to_std().unwrap_or_default();
                debug!("下一次检测时间: {}", next);
                tokio::time::sleep(wait).await;

                Self::spawn_cycle(
                    Arc::clone(&checker),
                    Arc::clone(&cycle_guard),
                    Arc::clone(&status),
                )
                .await;
            }
        }));

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        info!("停止任务调度器");

        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }

        // 等待进行中的周期把结果写回
        if tokio::time::timeout(STOP_GRACE_PERIOD, self.cycle_guard.lock())
            .await
            .is_err()
        {
            warn!("等待检测周期结束超时");
        }

        {
            let mut status = self.status.write().await;
            status.is_running = false;
            status.next_run = None;
        }

        info!("任务调度器已停止");
        Ok(())
    }

    async fn get_status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::probe::{ProbeResult, UrlProbe};
    use crate::notification::sender::NoOpSender;
    use crate::notification::{AlertTemplate, Channel, Notifier};
    use crate::store::{FileStore, UrlStatus};
    use crate::validation::NewRecord;
    use tempfile::TempDir;

    /// 每次探测前等待一段时间的探测器
    struct SlowProbe {
        delay: Duration,
    }

    #[async_trait]
    impl UrlProbe for SlowProbe {
        async fn probe(&self, _url: &str) -> ProbeResult {
            tokio::time::sleep(self.delay).await;
            ProbeResult {
                status: UrlStatus::Accessible,
                status_code: Some(200),
                error_message: None,
                response_time: self.delay,
            }
        }
    }

    fn scheduler(dir: &TempDir, delay: Duration) -> CycleScheduler {
        let store = FileStore::new(dir.path().join("urls.json"));
        store
            .add(NewRecord::parse("https://a.test", "+1 202 555 0100", "a@test.com").unwrap())
            .unwrap();

        let notifier = Notifier::new(
            AlertTemplate::new("{{url}} is not reachable").unwrap(),
            Arc::new(NoOpSender::new(Channel::Sms)),
            Arc::new(NoOpSender::new(Channel::Email)),
        );
        let checker = Checker::new(store, Arc::new(SlowProbe { delay }), Arc::new(notifier));

        CycleScheduler::new(
            Arc::new(checker),
            CronSchedule::parse("* * * * *").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_trigger_runs_cycle() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(&dir, Duration::from_millis(1));

        let handle = scheduler.trigger().await.expect("周期应当被触发");
        handle.await.unwrap();

        let status = scheduler.get_status().await;
        assert_eq!(status.cycles_run, 1);
        assert_eq!(status.cycles_skipped, 0);
        assert!(!status.cycle_in_progress);
        assert!(status.last_cycle_id.is_some());
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_skipped() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(&dir, Duration::from_millis(300));

        let first = scheduler.trigger().await.expect("第一次触发应当执行");
        assert!(scheduler.trigger().await.is_none());
        assert!(scheduler.trigger().await.is_none());

        first.await.unwrap();

        let status = scheduler.get_status().await;
        assert_eq!(status.cycles_run, 1);
        assert_eq!(status.cycles_skipped, 2);

        // 周期结束后可以再次触发
        let again = scheduler.trigger().await.expect("周期结束后应当可以再次触发");
        again.await.unwrap();
        assert_eq!(scheduler.get_status().await.cycles_run, 2);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let dir = TempDir::new().unwrap();
        let scheduler = scheduler(&dir, Duration::from_millis(1));

        scheduler.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let status = scheduler.get_status().await;
        assert!(status.is_running);
        assert!(status.next_run.is_some());

        scheduler.stop().await.unwrap();
        let status = scheduler.get_status().await;
        assert!(!status.is_running);
        assert!(status.next_run.is_none());
    }
}
