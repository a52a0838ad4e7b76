//! cron 调度表达式
//!
//! 支持标准五段式 cron：`分 时 日 月 周`。每段可以是 `*`、数字、范围 `a-b`、
//! 步长 `*/n` / `a-b/n` / `a/n` 以及逗号分隔的列表。不支持月份和星期的英文名称。
//! 所有时间按 UTC 计算。

use crate::error::ConfigError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use std::fmt;
use std::str::FromStr;

/// 向后搜索触发时间的最大跨度（天）
const SEARCH_HORIZON_DAYS: i64 = 366 * 5;

/// 单个字段允许的取值集合，第 n 位表示取值 n
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldSet(u64);

impl FieldSet {
    fn contains(&self, value: u32) -> bool {
        value < 64 && self.0 & (1u64 << value) != 0
    }
}

/// 字段定义：名称、最小值、最大值
struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
}

const MINUTE: FieldSpec = FieldSpec { name: "分钟", min: 0, max: 59 };
const HOUR: FieldSpec = FieldSpec { name: "小时", min: 0, max: 23 };
const DAY_OF_MONTH: FieldSpec = FieldSpec { name: "日期", min: 1, max: 31 };
const MONTH: FieldSpec = FieldSpec { name: "月份", min: 1, max: 12 };
// 0 和 7 都表示星期日
const DAY_OF_WEEK: FieldSpec = FieldSpec { name: "星期", min: 0, max: 7 };

/// 解析后的 cron 表达式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
    minutes: FieldSet,
    hours: FieldSet,
    days_of_month: FieldSet,
    months: FieldSet,
    days_of_week: FieldSet,
    /// 日期字段是否受限（不以 `*` 开头）
    dom_restricted: bool,
    /// 星期字段是否受限（不以 `*` 开头）
    dow_restricted: bool,
}

impl CronSchedule {
    /// 解析五段式 cron 表达式
    ///
    /// # 参数
    /// * `expression` - cron 表达式，例如 `* * * * *`
    ///
    /// # 返回
    /// * `Result<Self, ConfigError>` - 解析结果，失败时返回 `InvalidSchedule`
    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSchedule {
            expression: expression.to_string(),
            reason,
        };

        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(invalid(format!("需要 5 个字段，实际为 {} 个", fields.len())));
        }

        let minutes = parse_field(fields[0], &MINUTE).map_err(invalid)?;
        let hours = parse_field(fields[1], &HOUR).map_err(invalid)?;
        let days_of_month = parse_field(fields[2], &DAY_OF_MONTH).map_err(invalid)?;
        let months = parse_field(fields[3], &MONTH).map_err(invalid)?;
        let mut days_of_week = parse_field(fields[4], &DAY_OF_WEEK).map_err(invalid)?;
        if days_of_week.contains(7) {
            days_of_week.0 |= 1;
        }

        Ok(Self {
            expression: fields.join(" "),
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_restricted: !fields[2].starts_with('*'),
            dow_restricted: !fields[4].starts_with('*'),
        })
    }

    /// 规范化后的表达式文本
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// 计算严格晚于 `after` 的下一个触发时间
    ///
    /// 表达式永远不会触发（例如 `0 0 31 2 *`）时返回 `None`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut candidate = after.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let limit = candidate + Duration::days(SEARCH_HORIZON_DAYS);

        while candidate <= limit {
            let date = candidate.date_naive();

            if !self.months.contains(candidate.month()) {
                candidate = start_of_next_month(date)?;
                continue;
            }
            if !self.day_matches(date) {
                candidate = start_of_day(date.succ_opt()?)?;
                continue;
            }
            if !self.hours.contains(candidate.hour()) {
                candidate = candidate.with_minute(0)? + Duration::hours(1);
                continue;
            }
            if !self.minutes.contains(candidate.minute()) {
                candidate += Duration::minutes(1);
                continue;
            }
            return Some(candidate);
        }

        None
    }

    /// 日期与星期字段都受限时任一命中即可，否则只看受限的那一个
    fn day_matches(&self, date: NaiveDate) -> bool {
        let dom = self.days_of_month.contains(date.day());
        let dow = self
            .days_of_week
            .contains(date.weekday().num_days_from_sunday());

        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom || dow,
            (true, false) => dom,
            (false, true) => dow,
            (false, false) => true,
        }
    }
}

impl FromStr for CronSchedule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn start_of_next_month(date: NaiveDate) -> Option<DateTime<Utc>> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    start_of_day(NaiveDate::from_ymd_opt(year, month, 1)?)
}

fn parse_field(field: &str, spec: &FieldSpec) -> Result<FieldSet, String> {
    let mut bits = 0u64;

    for part in field.split(',') {
        if part.is_empty() {
            return Err(format!("{}字段包含空项", spec.name));
        }

        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step = parse_number(step, spec)?;
                if step == 0 {
                    return Err(format!("{}字段的步长不能为 0", spec.name));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" {
            (spec.min, spec.max)
        } else if let Some((start, end)) = range.split_once('-') {
            (parse_number(start, spec)?, parse_number(end, spec)?)
        } else {
            let value = parse_number(range, spec)?;
            // `a/n` 表示从 a 开始直到最大值
            if step.is_some() {
                (value, spec.max)
            } else {
                (value, value)
            }
        };

        if start < spec.min || end > spec.max {
            return Err(format!(
                "{}字段取值超出范围 {}-{}: {}",
                spec.name, spec.min, spec.max, part
            ));
        }
        if start > end {
            return Err(format!("{}字段范围起点大于终点: {}", spec.name, part));
        }

        for value in (start..=end).step_by(step.unwrap_or(1) as usize) {
            bits |= 1u64 << value;
        }
    }

    Ok(FieldSet(bits))
}

fn parse_number(text: &str, spec: &FieldSpec) -> Result<u32, String> {
    text.parse::<u32>()
        .map_err(|_| format!("{}字段包含无效数字: '{}'", spec.name, text))
}
