//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换和环境变量回退

use crate::config::types::{validate_config, Config, GatewayConfig};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    ///
    /// # 参数
    /// * `content` - 配置文件内容
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用 `${VAR}` 环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        // 匹配 ${VAR_NAME} 格式的环境变量
        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {e}")))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    /// 解析TOML内容，未配置的网关回退到环境变量
    fn parse_toml(&self, content: &str) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let mut config: Config = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {e}")))?;

        if config.notification.sms.is_none() {
            config.notification.sms = GatewayConfig::from_env("SMS");
        }
        if config.notification.email.is_none() {
            config.notification.email = GatewayConfig::from_env("EMAIL");
        }

        Ok(config)
    }

    /// 读取并解析配置文件，不做校验
    async fn read_file(&self, path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {e}")))?;

        self.parse_toml(&content)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();
        let config = self.read_file(path).await?;
        self.validate(&config)?;

        tracing::info!("成功加载配置文件: {}", path.display());
        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse_toml(content)?;
        self.validate(&config)?;

        tracing::debug!("成功解析配置字符串");
        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 加载配置
///
/// 显式指定的配置文件必须存在；未指定时依次尝试默认配置文件路径，
/// 都不存在则完全从环境变量构建。
pub async fn load_config(explicit_path: Option<&Path>) -> Result<Config> {
    let config = read_config(explicit_path).await?;
    TomlConfigLoader::new(true).validate(&config)?;
    Ok(config)
}

/// 按与 [`load_config`] 相同的来源读取配置，但不做校验
///
/// 供只操作存储的命令使用，调用方自行检查需要的字段。
pub async fn read_config(explicit_path: Option<&Path>) -> Result<Config> {
    let loader = TomlConfigLoader::new(true);

    if let Some(path) = explicit_path {
        return loader.read_file(path).await;
    }

    let default_path = get_default_config_path();
    if default_path.exists() {
        let config = loader.read_file(&default_path).await?;
        tracing::info!("成功加载配置文件: {}", default_path.display());
        return Ok(config);
    }

    tracing::debug!("未找到配置文件，使用环境变量配置");
    Ok(Config::from_env())
}

/// 获取默认配置文件路径
///
/// 当前目录下的 `url-monitor.toml` 优先，其次是用户配置目录
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from("url-monitor.toml");
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join("url-uptime-monitor").join("config.toml"))
        .unwrap_or(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    const TEST_CONFIG_TOML: &str = r#"
[store]
path = "/tmp/monitor/urls.json"

[schedule]
cron = "*/5 * * * *"
request_timeout_seconds = 10

[web]
port = 8081

[notification.sms]
endpoint = "https://gateway.test/sms"
username = "project"
api_key = "sms-key"
message_type = "text"
channel = "sms"
from = "MONITOR"

[notification.email]
endpoint = "https://gateway.test/email"
username = "project"
api_key = "email-key"
message_type = "html"
channel = "email"
from = "monitor@test.com"
"#;

    const TEST_CONFIG_WITH_ENV_VARS: &str = r#"
[notification.sms]
endpoint = "https://gateway.test/sms"
username = "project"
api_key = "${TEST_SMS_API_KEY}"
message_type = "text"
channel = "sms"
from = "MONITOR"
"#;

    #[tokio::test]
    async fn test_toml_parsing() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(TEST_CONFIG_TOML).await.unwrap();

        assert_eq!(config.store.path, PathBuf::from("/tmp/monitor/urls.json"));
        assert_eq!(config.schedule.cron, "*/5 * * * *");
        assert_eq!(config.schedule.request_timeout_seconds, 10);
        assert_eq!(config.web.port, 8081);
        assert_eq!(config.web.bind_address, "0.0.0.0");

        let (sms, email) = config.required_gateways().unwrap();
        assert_eq!(sms.api_key, "sms-key");
        assert_eq!(email.from, "monitor@test.com");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution() {
        env::set_var("TEST_SMS_API_KEY", "substituted-key");

        let loader = TomlConfigLoader::new(true);
        let config = loader
            .load_from_string(TEST_CONFIG_WITH_ENV_VARS)
            .await
            .unwrap();

        let sms = config.notification.sms.unwrap();
        assert_eq!(sms.api_key, "substituted-key");

        env::remove_var("TEST_SMS_API_KEY");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution_missing_var() {
        env::remove_var("TEST_SMS_API_KEY");

        let loader = TomlConfigLoader::new(true);
        let result = loader.load_from_string(TEST_CONFIG_WITH_ENV_VARS).await;

        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("TEST_SMS_API_KEY"));
        }
    }

    #[tokio::test]
    async fn test_invalid_schedule_rejected() {
        let loader = TomlConfigLoader::new(false);
        let result = loader
            .load_from_string("[schedule]\ncron = \"61 * * * *\"\n")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_CONFIG_TOML.as_bytes()).unwrap();

        let config = load_config(Some(file.path())).await.unwrap();
        assert_eq!(config.web.port, 8081);
    }

    #[tokio::test]
    async fn test_load_missing_explicit_file() {
        let result = load_config(Some(Path::new("/nonexistent/url-monitor.toml"))).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("配置文件不存在"));
    }

    #[test]
    fn test_substitute_env_vars_disabled() {
        let loader = TomlConfigLoader::new(false);
        let content = "test ${VAR} content";
        let result = loader.substitute_env_vars(content).unwrap();
        assert_eq!(result, content);
    }

    #[test]
    fn test_get_default_config_path() {
        let path = get_default_config_path();
        let path = path.to_string_lossy();
        assert!(path.ends_with("url-monitor.toml") || path.contains("url-uptime-monitor"));
    }
}
