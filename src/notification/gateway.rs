//! 通知网关发送器模块
//!
//! 以 multipart 表单向短信/邮件网关提交告警

use crate::config::GatewayConfig;
use crate::error::NotificationError;
use crate::notification::sender::{AlertMessage, Channel, NotificationSender};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::Form;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// 网关通知发送器
pub struct GatewaySender {
    /// HTTP客户端
    client: Client,
    /// 渠道
    channel: Channel,
    /// 网关配置
    config: GatewayConfig,
    /// 活动名称
    campaign: String,
}

impl GatewaySender {
    /// 创建新的网关发送器
    ///
    /// # 参数
    /// * `channel` - 渠道
    /// * `config` - 网关配置
    /// * `campaign` - 活动名称
    /// * `timeout` - 请求超时时间
    pub fn new(
        channel: Channel,
        config: GatewayConfig,
        campaign: String,
        timeout: Duration,
    ) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::ConfigError(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            channel,
            config,
            campaign,
        })
    }

    /// 构建网关表单
    fn build_form(&self, recipient: &str, message: &AlertMessage) -> Form {
        Form::new()
            .text("project", self.config.username.clone())
            .text("from", self.config.from.clone())
            .text("to", recipient.to_string())
            .text("campaign", self.campaign.clone())
            .text("channel", self.config.channel.clone())
            .text("apiKey", self.config.api_key.clone())
            .text("message", message.text.clone())
            .text("type", self.config.message_type.clone())
    }
}

#[async_trait]
impl NotificationSender for GatewaySender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send_alert(
        &self,
        recipient: &str,
        message: &AlertMessage,
    ) -> Result<(), NotificationError> {
        debug!("发送{}告警到网关: {}", self.channel, self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(ACCEPT, "application/json")
            .multipart(self.build_form(recipient, message))
            .send()
            .await
            .map_err(|e| NotificationError::SendError(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            debug!("{}网关响应: {}", self.channel, body);
            Ok(())
        } else {
            Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn gateway_config(endpoint: String) -> GatewayConfig {
        GatewayConfig {
            endpoint,
            username: "uptime-project".to_string(),
            api_key: "secret-key".to_string(),
            message_type: "plain".to_string(),
            channel: "sms-channel".to_string(),
            from: "MONITOR".to_string(),
        }
    }

    fn message() -> AlertMessage {
        AlertMessage {
            url: "https://a.test".to_string(),
            text: "https://a.test is not reachable".to_string(),
        }
    }

    /// multipart 表单中某个字段的匹配器
    fn form_field(name: &str, value: &str) -> Matcher {
        Matcher::Regex(format!(
            "name=\"{}\"\r\n\r\n{}\r\n",
            regex::escape(name),
            regex::escape(value)
        ))
    }

    #[tokio::test]
    async fn test_send_alert_posts_multipart_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/sms")
            .match_header("accept", "application/json")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".to_string()))
            .match_body(Matcher::AllOf(vec![
                form_field("project", "uptime-project"),
                form_field("from", "MONITOR"),
                form_field("to", "+1 202 555 0100"),
                form_field("campaign", "URL Uptime Monitoring"),
                form_field("channel", "sms-channel"),
                form_field("apiKey", "secret-key"),
                form_field("message", "https://a.test is not reachable"),
                form_field("type", "plain"),
            ]))
            .with_status(200)
            .with_body(r#"{"status":"queued"}"#)
            .expect(1)
            .create_async()
            .await;

        let sender = GatewaySender::new(
            Channel::Sms,
            gateway_config(format!("{}/sms", server.url())),
            "URL Uptime Monitoring".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let result = sender.send_alert("+1 202 555 0100", &message()).await;
        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/email")
            .with_status(401)
            .with_body("invalid api key")
            .expect(1)
            .create_async()
            .await;

        let sender = GatewaySender::new(
            Channel::Email,
            gateway_config(format!("{}/email", server.url())),
            "URL Uptime Monitoring".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        match sender.send_alert("a@test.com", &message()).await {
            Err(NotificationError::Rejected { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("期望网关拒绝错误，实际: {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_send_error() {
        let sender = GatewaySender::new(
            Channel::Sms,
            gateway_config("http://127.0.0.1:1/sms".to_string()),
            "URL Uptime Monitoring".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();

        let result = sender.send_alert("+1 202 555 0100", &message()).await;
        assert!(matches!(result, Err(NotificationError::SendError(_))));
    }
}
