use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::rate_limit::RateLimitOptions;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub rate_limit_window_ms: u64,
    pub rate_limit_requests: u32,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub storage_redis_url: Option<String>,
    pub storage_db_name: String,
    pub storage_collection: String,
    pub storage_fallback_dir: Option<PathBuf>,
    pub storage_fallback_quota_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
            rate_limit_window_ms: 60_000,
            rate_limit_requests: 10,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".into(),
            openai_base_url: "https://api.openai.com/v1".into(),
            storage_redis_url: None,
            storage_db_name: "afroxhub-storage".into(),
            storage_collection: "kv".into(),
            storage_fallback_dir: None,
            // 与浏览器 localStorage 的常见配额一致
            storage_fallback_quota_bytes: 5 * 1024 * 1024,
        }
    }
}

/// 读取非空环境变量，空字符串视为未设置
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        Ok(Config {
            server_host: optional("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            api_base_uri: optional("API_BASE_URI").unwrap_or(defaults.api_base_uri),
            rate_limit_window_ms: env::var("RATE_LIMIT_WINDOW_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.rate_limit_window_ms),
            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.rate_limit_requests),
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_model: optional("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: optional("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            storage_redis_url: optional("STORAGE_REDIS_URL"),
            storage_db_name: optional("STORAGE_DB_NAME").unwrap_or(defaults.storage_db_name),
            storage_collection: optional("STORAGE_COLLECTION")
                .unwrap_or(defaults.storage_collection),
            storage_fallback_dir: optional("STORAGE_FALLBACK_DIR").map(PathBuf::from),
            storage_fallback_quota_bytes: env::var("STORAGE_FALLBACK_QUOTA_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.storage_fallback_quota_bytes),
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    /// 生成接口使用的限流参数
    pub fn rate_limit_options(&self) -> RateLimitOptions {
        RateLimitOptions {
            window_ms: self.rate_limit_window_ms,
            max: self.rate_limit_requests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_options_follow_config() {
        let config = Config {
            rate_limit_window_ms: 3_600_000,
            rate_limit_requests: 10,
            ..Config::default()
        };
        let options = config.rate_limit_options();
        assert_eq!(options.window_ms, 3_600_000);
        assert_eq!(options.max, 10);
        assert_eq!(config.rate_limit_window(), Duration::from_secs(3600));
    }
}
