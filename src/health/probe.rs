//! URL 可达性探测
//!
//! 对被监控的 URL 发起一次 GET 请求，只有 HTTP 200 视为可达

use crate::error::ProbeError;
use crate::store::UrlStatus;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// 单次探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// 探测得到的状态
    pub status: UrlStatus,
    /// HTTP 状态码，传输层失败时为空
    pub status_code: Option<u16>,
    /// 不可达时的原因描述
    pub error_message: Option<String>,
    /// 响应时间
    pub response_time: Duration,
}

impl ProbeResult {
    fn from_status_code(status_code: u16, response_time: Duration) -> Self {
        let reachable = status_code == StatusCode::OK.as_u16();
        Self {
            status: if reachable {
                UrlStatus::Accessible
            } else {
                UrlStatus::Inaccessible
            },
            status_code: Some(status_code),
            error_message: (!reachable).then(|| {
                format!(
                    "HTTP {} {}",
                    status_code,
                    StatusCode::from_u16(status_code)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or("Unknown")
                )
            }),
            response_time,
        }
    }

    fn failed(error_message: String, response_time: Duration) -> Self {
        Self {
            status: UrlStatus::Inaccessible,
            status_code: None,
            error_message: Some(error_message),
            response_time,
        }
    }
}

/// URL 探测器trait
#[async_trait]
pub trait UrlProbe: Send + Sync {
    /// 探测一个 URL，任何失败都体现为 `Inaccessible`，不返回错误
    async fn probe(&self, url: &str) -> ProbeResult;
}

/// 基于 reqwest 的 HTTP 探测器
pub struct HttpProbe {
    /// HTTP客户端
    client: Client,
    /// 请求超时时间
    timeout: Duration,
}

impl HttpProbe {
    /// 创建新的 HTTP 探测器
    ///
    /// # 参数
    /// * `timeout` - 单次请求超时时间
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self { client, timeout })
    }

    /// 格式化请求错误信息，使其更加清晰易读
    fn format_request_error(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            "Connection refused".to_string()
        } else if error.is_builder() {
            "Invalid request".to_string()
        } else if error.is_decode() {
            "Response decode error".to_string()
        } else {
            let error_str = error.to_string();
            if error_str.contains("dns") || error_str.contains("DNS") {
                "DNS resolution failed".to_string()
            } else if error_str.contains("certificate")
                || error_str.contains("tls")
                || error_str.contains("ssl")
            {
                "SSL/TLS certificate error".to_string()
            } else {
                format!("Request failed: {error_str}")
            }
        }
    }
}

#[async_trait]
impl UrlProbe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbeResult {
        let start_time = Instant::now();
        let response = timeout(self.timeout, self.client.get(url).send()).await;
        let response_time = start_time.elapsed();

        match response {
            Ok(Ok(response)) => {
                ProbeResult::from_status_code(response.status().as_u16(), response_time)
            }
            Ok(Err(e)) => ProbeResult::failed(Self::format_request_error(&e), response_time),
            Err(_) => ProbeResult::failed("Request timeout".to_string(), response_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_200_is_accessible() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(200)
            .create_async()
            .await;

        let probe = HttpProbe::new(Duration::from_secs(5)).unwrap();
        let result = probe.probe(&server.url()).await;

        assert_eq!(result.status, UrlStatus::Accessible);
        assert_eq!(result.status_code, Some(200));
        assert!(result.error_message.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_other_success_codes_are_inaccessible() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/created")
            .with_status(201)
            .create_async()
            .await;

        let probe = HttpProbe::new(Duration::from_secs(5)).unwrap();
        let result = probe.probe(&format!("{}/created", server.url())).await;

        assert_eq!(result.status, UrlStatus::Inaccessible);
        assert_eq!(result.status_code, Some(201));
    }

    #[tokio::test]
    async fn test_server_error_is_inaccessible() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/down")
            .with_status(503)
            .create_async()
            .await;

        let probe = HttpProbe::new(Duration::from_secs(5)).unwrap();
        let result = probe.probe(&format!("{}/down", server.url())).await;

        assert_eq!(result.status, UrlStatus::Inaccessible);
        assert_eq!(result.status_code, Some(503));
        assert!(result.error_message.unwrap().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_inaccessible() {
        let probe = HttpProbe::new(Duration::from_secs(2)).unwrap();
        let result = probe.probe("http://127.0.0.1:1/").await;

        assert_eq!(result.status, UrlStatus::Inaccessible);
        assert!(result.status_code.is_none());
        assert!(result.error_message.is_some());
    }

    #[tokio::test]
    async fn test_unresponsive_server_times_out() {
        // 接受连接但从不回应
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let probe = HttpProbe::new(Duration::from_millis(200)).unwrap();
        let result = probe.probe(&format!("http://{addr}/")).await;

        assert_eq!(result.status, UrlStatus::Inaccessible);
        assert_eq!(result.status_code, None);
        assert_eq!(result.error_message.as_deref(), Some("Request timeout"));
        assert!(result.response_time < Duration::from_secs(5));

        server.abort();
    }

    #[test]
    fn test_probe_result_from_status_code() {
        let ok = ProbeResult::from_status_code(200, Duration::from_millis(5));
        assert!(ok.status.is_accessible());

        let not_found = ProbeResult::from_status_code(404, Duration::from_millis(5));
        assert_eq!(not_found.error_message.as_deref(), Some("HTTP 404 Not Found"));
    }
}
