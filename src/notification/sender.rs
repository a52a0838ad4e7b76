//! 通知发送器模块
//!
//! 定义通知发送的trait和基础实现

use crate::error::NotificationError;
use async_trait::async_trait;

/// 通知渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// 短信
    Sms,
    /// 邮件
    Email,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Sms => write!(f, "SMS"),
            Channel::Email => write!(f, "Email"),
        }
    }
}

/// 告警消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    /// 不可达的 URL
    pub url: String,
    /// 渲染后的消息正文
    pub text: String,
}

/// 通知发送器trait，每个渠道一个实现
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 发送器对应的渠道
    fn channel(&self) -> Channel;

    /// 发送告警
    ///
    /// # 参数
    /// * `recipient` - 接收方（手机号或邮箱列表）
    /// * `message` - 告警消息
    ///
    /// # 返回
    /// * `Result<(), NotificationError>` - 发送结果，失败不重试
    async fn send_alert(
        &self,
        recipient: &str,
        message: &AlertMessage,
    ) -> Result<(), NotificationError>;
}

/// 空的通知发送器实现（用于测试）
#[cfg(test)]
pub(crate) struct NoOpSender {
    channel: Channel,
}

#[cfg(test)]
impl NoOpSender {
    /// 创建指定渠道的空发送器
    pub(crate) fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[cfg(test)]
#[async_trait]
impl NotificationSender for NoOpSender {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send_alert(
        &self,
        _recipient: &str,
        _message: &AlertMessage,
    ) -> Result<(), NotificationError> {
        // 不执行任何操作
        Ok(())
    }
}
