//! 检测周期实现
//!
//! 一次周期：读取存储快照，按存储顺序逐个探测，不可达时发送告警，
//! 最后在一次加锁更新中把结果按 URL 合并回存储。

use crate::error::StoreError;
use crate::health::probe::UrlProbe;
use crate::notification::Notifier;
use crate::store::{now_timestamp, FileStore, StatusUpdate, UrlStatus};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 通知统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationStats {
    /// 总通知发送次数
    pub total_sent: u32,
    /// 通知发送成功次数
    pub successful_sent: u32,
    /// 通知发送失败次数
    pub failed_sent: u32,
}

/// 单条记录在一次周期中的检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    /// 记录的 URL
    pub url: String,
    /// 检测状态
    pub status: UrlStatus,
    /// HTTP 状态码
    pub status_code: Option<u16>,
    /// 不可达原因
    pub error_message: Option<String>,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

/// 一次检测周期的汇总
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// 周期标识
    pub cycle_id: Uuid,
    /// 周期开始时间（UTC，写入每条记录的 `last_time`）
    pub timestamp: NaiveDateTime,
    /// 可达数量
    pub accessible: usize,
    /// 不可达数量
    pub inaccessible: usize,
    /// 实际写回存储的记录数
    pub updated: usize,
    /// 每条记录的结果，顺序与存储一致
    pub outcomes: Vec<RecordOutcome>,
    /// 本周期的通知统计
    pub notification_stats: NotificationStats,
}

impl CycleReport {
    /// 探测的记录总数
    pub fn checked(&self) -> usize {
        self.outcomes.len()
    }
}

/// 检测器：串联存储、探测器和通知器
pub struct Checker {
    store: FileStore,
    probe: Arc<dyn UrlProbe>,
    notifier: Arc<Notifier>,
}

impl Checker {
    /// 创建新的检测器
    pub fn new(store: FileStore, probe: Arc<dyn UrlProbe>, notifier: Arc<Notifier>) -> Self {
        Self {
            store,
            probe,
            notifier,
        }
    }

    /// 执行一次完整的检测周期
    ///
    /// 探测失败和通知失败都不会中断周期；只有存储读写失败会返回错误，
    /// 此时本周期的结果不会写回。
    pub async fn run_cycle(&self) -> Result<CycleReport, StoreError> {
        let cycle_id = Uuid::new_v4();
        let timestamp = now_timestamp();

        let records = self.store.blocking(|store| store.load()).await?;
        info!(cycle_id = %cycle_id, records = records.len(), "开始检测周期");

        let mut outcomes = Vec::with_capacity(records.len());
        let mut notification_stats = NotificationStats::default();

        for record in &records {
            let result = self.probe.probe(&record.url).await;

            if result.status.is_accessible() {
                debug!(url = %record.url, "URL 可达");
            } else {
                warn!(
                    url = %record.url,
                    error = result.error_message.as_deref().unwrap_or("N/A"),
                    "URL 不可达"
                );

                let report = self.notifier.notify(record).await;
                notification_stats.total_sent += 2;
                notification_stats.successful_sent += report.succeeded() as u32;
                notification_stats.failed_sent += report.failed() as u32;
            }

            outcomes.push(RecordOutcome {
                url: record.url.clone(),
                status: result.status,
                status_code: result.status_code,
                error_message: result.error_message,
                response_time_ms: result.response_time.as_millis() as u64,
            });
        }

        let updates: Vec<StatusUpdate> = records
            .into_iter()
            .zip(&outcomes)
            .map(|(snapshot, outcome)| StatusUpdate {
                snapshot,
                status: outcome.status,
            })
            .collect();
        let updated = self
            .store
            .blocking(move |store| store.apply_results(&updates, timestamp))
            .await?;

        let accessible = outcomes
            .iter()
            .filter(|outcome| outcome.status.is_accessible())
            .count();

        let report = CycleReport {
            cycle_id,
            timestamp,
            accessible,
            inaccessible: outcomes.len() - accessible,
            updated,
            outcomes,
            notification_stats,
        };

        info!(
            cycle_id = %cycle_id,
            checked = report.checked(),
            accessible = report.accessible,
            inaccessible = report.inaccessible,
            notifications_failed = report.notification_stats.failed_sent,
            "检测周期完成"
        );

        Ok(report)
    }
}
