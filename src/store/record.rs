//! 监控记录数据结构
//!
//! 定义持久化的 URL 记录、检测状态枚举以及时间戳格式

use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// 存储文件中的时间戳格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// URL 可达状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlStatus {
    /// 探测返回 HTTP 200
    Accessible,
    /// 其他状态码或传输层失败
    Inaccessible,
}

impl std::fmt::Display for UrlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlStatus::Accessible => write!(f, "Accessible"),
            UrlStatus::Inaccessible => write!(f, "Inaccessible"),
        }
    }
}

impl UrlStatus {
    /// 判断是否可达
    pub fn is_accessible(&self) -> bool {
        matches!(self, UrlStatus::Accessible)
    }
}

/// 一条被监控的 URL 记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredUrl {
    /// 被监控的 URL，在存储中唯一
    pub url: String,
    /// 短信通知号码
    pub mobile: String,
    /// 邮件通知地址，可包含多个以逗号分隔的地址
    pub email: String,
    /// 最后一次检测状态，首次检测前为空
    #[serde(default)]
    pub last_status: Option<UrlStatus>,
    /// 最后一次检测时间（UTC，秒级精度）
    #[serde(default, with = "timestamp_format")]
    pub last_time: Option<NaiveDateTime>,
}

impl MonitoredUrl {
    /// 创建尚未检测过的记录
    pub fn new(url: String, mobile: String, email: String) -> Self {
        Self {
            url,
            mobile,
            email,
            last_status: None,
            last_time: None,
        }
    }
}

/// 一次检测对单条记录的状态更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// 检测开始时读到的记录，写回时存储中的记录必须与之完全一致
    pub snapshot: MonitoredUrl,
    /// 本次检测状态
    pub status: UrlStatus,
}

/// 当前时间，截断到秒
pub fn now_timestamp() -> NaiveDateTime {
    Utc::now().trunc_subsecs(0).naive_utc()
}

/// 可空时间戳的 `"YYYY-MM-DD HH:MM:SS"` 序列化
mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_some(&time.format(TIMESTAMP_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        value
            .map(|s| {
                NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}
