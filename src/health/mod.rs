//! 健康检测模块
//!
//! 提供 URL 探测、检测周期、cron 调度表达式和单飞调度器

pub mod checker;
pub mod probe;
pub mod schedule;
pub mod scheduler;

// 重新导出主要类型
pub use checker::{Checker, CycleReport, NotificationStats, RecordOutcome};
pub use probe::{HttpProbe, ProbeResult, UrlProbe};
pub use schedule::CronSchedule;
pub use scheduler::{CycleScheduler, Scheduler, SchedulerStatus};
