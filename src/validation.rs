//! 输入校验模块
//!
//! 校验新增记录的 URL、手机号和邮箱地址

use crate::error::ValidationError;
use crate::store::MonitoredUrl;
use regex::Regex;
use reqwest::Url;
use std::sync::OnceLock;

/// 手机号允许的最少数字位数
const MIN_PHONE_DIGITS: usize = 7;
/// E.164 规定的最多数字位数
const MAX_PHONE_DIGITS: usize = 15;

fn phone_regex() -> &'static Regex {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    PHONE_REGEX.get_or_init(|| {
        Regex::new(r"^\+?[0-9()][0-9()\s.\-]*$").expect("手机号正则表达式无效")
    })
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
        )
        .expect("邮箱正则表达式无效")
    })
}

/// 校验绝对 URL
///
/// 只接受带主机名的 http/https 地址，且不允许包含空白字符
pub fn validate_url(s: &str) -> bool {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return false;
    }

    match Url::parse(s) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// 宽松的国际手机号校验
///
/// 允许可选的 `+` 前缀以及空格、横线、点和括号分隔，数字位数在 7 到 15 之间
pub fn validate_phone(s: &str) -> bool {
    let s = s.trim();
    if !phone_regex().is_match(s) {
        return false;
    }

    let digits = s.chars().filter(char::is_ascii_digit).count();
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
}

/// 校验单个邮箱地址
pub fn validate_email(s: &str) -> bool {
    if s.len() > 254 {
        return false;
    }

    match s.split_once('@') {
        Some((local, _)) if local.len() <= 64 => email_regex().is_match(s),
        _ => false,
    }
}

/// 校验以逗号分隔的邮箱列表
///
/// # 返回
/// * `Ok(Vec<String>)` - 去除空白后的地址列表
/// * `Err(ValidationError::InvalidEmail)` - 携带第一个无效的地址
pub fn validate_emails(s: &str) -> Result<Vec<String>, ValidationError> {
    s.split(',')
        .map(str::trim)
        .map(|address| {
            if validate_email(address) {
                Ok(address.to_string())
            } else {
                Err(ValidationError::InvalidEmail(address.to_string()))
            }
        })
        .collect()
}

/// 通过校验的新记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    url: String,
    mobile: String,
    email: String,
}

impl NewRecord {
    /// 依次校验 URL、手机号和邮箱，返回第一个失败的字段
    pub fn parse(url: &str, mobile: &str, email: &str) -> Result<Self, ValidationError> {
        if !validate_url(url) {
            return Err(ValidationError::InvalidUrl(url.to_string()));
        }

        if !validate_phone(mobile) {
            return Err(ValidationError::InvalidMobile(mobile.to_string()));
        }

        validate_emails(email)?;

        Ok(Self {
            url: url.to_string(),
            mobile: mobile.to_string(),
            email: email.to_string(),
        })
    }

    /// 记录的 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 转换为尚未检测的存储记录
    pub fn into_record(self) -> MonitoredUrl {
        MonitoredUrl::new(self.url, self.mobile, self.email)
    }
}
