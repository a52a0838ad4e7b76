//! Web 路由处理函数
//!
//! 状态页、表单提交以及 JSON 接口

use super::AppState;
use crate::error::StoreError;
use crate::store::{AddOutcome, DeleteOutcome, MonitoredUrl, TIMESTAMP_FORMAT};
use crate::validation::NewRecord;
use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    Form,
};
use serde::Deserialize;
use tracing::{error, info};

/// 尚未检测时页面上显示的文本
const NOT_CHECKED: &str = "Not checked yet";

/// 状态页模板
#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    rows: Vec<UrlRow>,
    schedule: String,
    refresh_interval_ms: u64,
}

/// 状态表中的一行
struct UrlRow {
    url: String,
    mobile: String,
    email: String,
    last_status: String,
    last_time: String,
}

impl From<MonitoredUrl> for UrlRow {
    fn from(record: MonitoredUrl) -> Self {
        Self {
            mobile: mask_contact(&record.mobile),
            email: mask_contact(&record.email),
            last_status: record
                .last_status
                .map(|status| status.to_string())
                .unwrap_or_else(|| NOT_CHECKED.to_string()),
            last_time: record
                .last_time
                .map(|time| time.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_else(|| NOT_CHECKED.to_string()),
            url: record.url,
        }
    }
}

/// 添加表单
#[derive(Debug, Deserialize)]
pub struct AddForm {
    #[serde(default)]
    url: String,
    #[serde(default)]
    mobile: String,
    #[serde(default)]
    email: String,
}

/// 删除表单
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    url: String,
}

/// 把前 4 个字符替换为 `*`
pub fn mask_contact(value: &str) -> String {
    value
        .chars()
        .enumerate()
        .map(|(i, c)| if i < 4 { '*' } else { c })
        .collect()
}

fn store_error(e: StoreError) -> Response {
    error!("存储操作失败: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Store error").into_response()
}

/// 状态页
pub async fn index(State(state): State<AppState>) -> Response {
    let records = match state.store.blocking(|store| store.list()).await {
        Ok(records) => records,
        Err(e) => return store_error(e),
    };

    let template = IndexTemplate {
        rows: records.into_iter().map(UrlRow::from).collect(),
        schedule: state.schedule.clone(),
        refresh_interval_ms: u64::from(state.config.refresh_interval_seconds) * 1000,
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("模板渲染失败: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "模板渲染失败").into_response()
        }
    }
}

/// 添加 URL
pub async fn add_url(State(state): State<AppState>, Form(form): Form<AddForm>) -> Response {
    let record = match NewRecord::parse(&form.url, &form.mobile, &form.email) {
        Ok(record) => record,
        Err(e) => {
            info!(field = e.field(), "拒绝无效的添加请求: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match state.store.blocking(move |store| store.add(record)).await {
        Ok(AddOutcome::Added) => (StatusCode::OK, "URL added successfully").into_response(),
        Ok(AddOutcome::AlreadyExists) => {
            (StatusCode::CONFLICT, "URL already exists").into_response()
        }
        Err(e) => store_error(e),
    }
}

/// 删除 URL
pub async fn delete_url(State(state): State<AppState>, Form(form): Form<DeleteForm>) -> Response {
    let url = form.url;
    match state.store.blocking(move |store| store.delete(&url)).await {
        Ok(DeleteOutcome::Deleted) => (StatusCode::OK, "URL deleted successfully").into_response(),
        Ok(DeleteOutcome::NotFound) => (StatusCode::NOT_FOUND, "URL not found").into_response(),
        Err(e) => store_error(e),
    }
}

/// 联系方式打码后的记录，用于对外展示
fn masked(record: MonitoredUrl) -> MonitoredUrl {
    MonitoredUrl {
        mobile: mask_contact(&record.mobile),
        email: mask_contact(&record.email),
        ..record
    }
}

/// 以 JSON 返回全部记录，字段格式与存储文件一致，联系方式与页面一样打码
pub async fn api_urls(State(state): State<AppState>) -> Response {
    match state.store.blocking(|store| store.list()).await {
        Ok(records) => {
            let records: Vec<MonitoredUrl> = records.into_iter().map(masked).collect();
            Json(records).into_response()
        }
        Err(e) => store_error(e),
    }
}

/// 存活检查
pub async fn healthz() -> impl IntoResponse {
    "ok"
}
