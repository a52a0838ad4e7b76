//! 存储模块
//!
//! 提供监控记录的数据结构和 JSON 文件存储

pub mod file_store;
pub mod record;

// 重新导出主要类型
pub use file_store::{AddOutcome, DeleteOutcome, FileStore};
pub use record::{now_timestamp, MonitoredUrl, StatusUpdate, UrlStatus, TIMESTAMP_FORMAT};
