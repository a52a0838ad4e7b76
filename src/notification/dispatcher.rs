//! 通知分发模块
//!
//! 为不可达的记录渲染告警消息，先发短信再发邮件

use crate::config::Config;
use crate::error::{ConfigError, NotificationError};
use crate::notification::gateway::GatewaySender;
use crate::notification::sender::{AlertMessage, Channel, NotificationSender};
use crate::notification::template::AlertTemplate;
use crate::store::MonitoredUrl;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 一次分发中各渠道的发送结果
#[derive(Debug)]
pub struct DispatchReport {
    /// 短信发送结果
    pub sms: Result<(), NotificationError>,
    /// 邮件发送结果
    pub email: Result<(), NotificationError>,
}

impl DispatchReport {
    /// 发送成功的渠道数
    pub fn succeeded(&self) -> usize {
        [&self.sms, &self.email]
            .iter()
            .filter(|result| result.is_ok())
            .count()
    }

    /// 发送失败的渠道数
    pub fn failed(&self) -> usize {
        2 - self.succeeded()
    }
}

/// 告警通知器
pub struct Notifier {
    template: AlertTemplate,
    sms: Arc<dyn NotificationSender>,
    email: Arc<dyn NotificationSender>,
}

impl Notifier {
    /// 使用给定的模板和发送器创建通知器
    pub fn new(
        template: AlertTemplate,
        sms: Arc<dyn NotificationSender>,
        email: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            template,
            sms,
            email,
        }
    }

    /// 根据配置创建通知器，两个网关的配置必须完整
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let (sms_config, email_config) = config.required_gateways()?;
        let notification = &config.notification;
        let timeout = Duration::from_secs(notification.timeout_seconds);

        let template = AlertTemplate::new(&notification.message_template)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        let build = |channel: Channel, gateway: &crate::config::GatewayConfig| {
            GatewaySender::new(
                channel,
                gateway.clone(),
                notification.campaign.clone(),
                timeout,
            )
            .map(|sender| Arc::new(sender) as Arc<dyn NotificationSender>)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
        };

        Ok(Self::new(
            template,
            build(Channel::Sms, sms_config)?,
            build(Channel::Email, email_config)?,
        ))
    }

    /// 为一条不可达的记录发送告警
    ///
    /// 短信和邮件都会尝试发送，任一渠道失败不影响另一个
    pub async fn notify(&self, record: &MonitoredUrl) -> DispatchReport {
        let message = match self.template.render(record) {
            Ok(text) => AlertMessage {
                url: record.url.clone(),
                text,
            },
            Err(e) => {
                warn!("渲染告警消息失败 {}: {}", record.url, e);
                return DispatchReport {
                    sms: Err(NotificationError::TemplateError(e.to_string())),
                    email: Err(NotificationError::TemplateError(e.to_string())),
                };
            }
        };

        let sms = self.send(&self.sms, &record.mobile, &message).await;
        let email = self.send(&self.email, &record.email, &message).await;

        DispatchReport { sms, email }
    }

    async fn send(
        &self,
        sender: &Arc<dyn NotificationSender>,
        recipient: &str,
        message: &AlertMessage,
    ) -> Result<(), NotificationError> {
        let channel = sender.channel();
        let result = sender.send_alert(recipient, message).await;

        match &result {
            Ok(()) => info!(
                url = %message.url,
                channel = %channel,
                "告警已发送"
            ),
            Err(e) => warn!(
                url = %message.url,
                channel = %channel,
                error = %e,
                "告警发送失败"
            ),
        }

        result
    }
}
