//! 消息模板模块
//!
//! 使用 handlebars 渲染告警消息正文

use crate::error::NotificationError;
use crate::store::MonitoredUrl;
use handlebars::Handlebars;
use serde_json::json;

const TEMPLATE_NAME: &str = "alert";

/// 告警消息模板
pub struct AlertTemplate {
    registry: Handlebars<'static>,
}

impl AlertTemplate {
    /// 编译模板
    ///
    /// # 参数
    /// * `template` - handlebars 模板，可用变量 `url`、`mobile`、`email`
    pub fn new(template: &str) -> Result<Self, NotificationError> {
        let mut registry = Handlebars::new();
        // 消息是纯文本，不做 HTML 转义
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))?;

        Ok(Self { registry })
    }

    /// 为记录渲染告警正文
    pub fn render(&self, record: &MonitoredUrl) -> Result<String, NotificationError> {
        let data = json!({
            "url": record.url,
            "mobile": record.mobile,
            "email": record.email,
        });

        self.registry
            .render(TEMPLATE_NAME, &data)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> MonitoredUrl {
        MonitoredUrl::new(
            url.to_string(),
            "+1 202 555 0100".to_string(),
            "a@test.com".to_string(),
        )
    }

    #[test]
    fn test_default_message() {
        let template = AlertTemplate::new("{{url}} is not reachable").unwrap();
        let text = template.render(&record("https://a.test")).unwrap();
        assert_eq!(text, "https://a.test is not reachable");
    }

    #[test]
    fn test_query_string_not_escaped() {
        let template = AlertTemplate::new("{{url}} is not reachable").unwrap();
        let text = template.render(&record("https://a.test/?a=1&b=2")).unwrap();
        assert_eq!(text, "https://a.test/?a=1&b=2 is not reachable");
    }

    #[test]
    fn test_custom_template_fields() {
        let template = AlertTemplate::new("DOWN {{url}} (notify {{mobile}} / {{email}})").unwrap();
        let text = template.render(&record("https://a.test")).unwrap();
        assert_eq!(text, "DOWN https://a.test (notify +1 202 555 0100 / a@test.com)");
    }

    #[test]
    fn test_invalid_template() {
        let result = AlertTemplate::new("{{#if url}} unterminated");
        assert!(matches!(result, Err(NotificationError::TemplateError(_))));
    }
}
