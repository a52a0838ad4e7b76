//! 通知模块
//!
//! 提供短信/邮件网关发送器、消息模板和告警分发功能

pub mod dispatcher;
pub mod gateway;
pub mod sender;
pub mod template;

// 重新导出主要类型
pub use dispatcher::{DispatchReport, Notifier};
pub use gateway::GatewaySender;
pub use sender::{AlertMessage, Channel, NotificationSender};
pub use template::AlertTemplate;
