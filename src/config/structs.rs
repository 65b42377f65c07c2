use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::{ClickLedgerError, Result};

/// 持久计数存储后端
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Default,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DatabaseBackend {
    #[default]
    Sqlite,
    #[serde(alias = "mariadb")]
    #[strum(to_string = "mysql", serialize = "mariadb")]
    Mysql,
    #[serde(alias = "postgresql")]
    #[strum(to_string = "postgres", serialize = "postgresql")]
    Postgres,
    /// 仅内存，进程退出即丢失（测试与本地调试）
    Memory,
}

/// 降级计数存储后端
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Default,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FallbackBackend {
    #[default]
    Memory,
    Redis,
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 优先级：ENV > config.toml > 默认值
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub counter: CounterConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub routes: RouteConfig,
    #[serde(default)]
    pub dev: DevConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// ENV 前缀：CL，分隔符：__
    /// 示例：CL__SERVER__PORT=9999
    pub fn load(path: &str) -> Result<Self> {
        use config::{Config, Environment, File};

        let settings = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖
            .add_source(
                Environment::with_prefix("CL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: StaticConfig = settings.try_deserialize()?;
        if std::path::Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }
        config.validate()?;
        Ok(config)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 拒绝无法工作的配置组合
    pub fn validate(&self) -> Result<()> {
        let counter = &self.counter;
        if counter.max_clicks == 0 {
            return Err(ClickLedgerError::config("counter.max_clicks must be > 0"));
        }
        if counter.stats_window == 0 || counter.stats_window > counter.max_clicks {
            return Err(ClickLedgerError::config(format!(
                "counter.stats_window must be within 1..={}",
                counter.max_clicks
            )));
        }
        if counter.offer_item_max_chars == 0 || counter.client_ip_max_chars == 0 {
            return Err(ClickLedgerError::config(
                "counter truncation limits must be > 0",
            ));
        }
        if counter.mailbox_capacity == 0 {
            return Err(ClickLedgerError::config(
                "counter.mailbox_capacity must be > 0",
            ));
        }
        if counter.durable_timeout_ms == 0 || self.fallback.timeout_ms == 0 {
            return Err(ClickLedgerError::config("timeouts must be > 0 ms"));
        }
        if self.fallback.backend == FallbackBackend::Redis && self.fallback.redis_url.is_empty()
        {
            return Err(ClickLedgerError::config(
                "fallback.redis_url is required for the redis backend",
            ));
        }
        for prefix in [
            &self.routes.admin_prefix,
            &self.routes.health_prefix,
            &self.routes.dev_prefix,
        ] {
            if !prefix.starts_with('/') {
                return Err(ClickLedgerError::config(format!(
                    "route prefix '{}' must start with '/'",
                    prefix
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// 可重试错误的最大重试次数
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::default(),
            database_url: default_database_url(),
            pool_size: default_pool_size(),
            retry_count: default_retry_count(),
        }
    }
}

/// 单个计数对象的行为参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    /// 每个 barcode 保留的最近点击条数
    #[serde(default = "default_max_clicks")]
    pub max_clicks: usize,
    /// GetStats 返回的最近点击条数
    #[serde(default = "default_stats_window")]
    pub stats_window: usize,
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// 点击写入等待持久计数的上限
    #[serde(default = "default_durable_timeout_ms")]
    pub durable_timeout_ms: u64,
    #[serde(default = "default_url_max_chars")]
    pub url_max_chars: usize,
    #[serde(default = "default_user_agent_max_chars")]
    pub user_agent_max_chars: usize,
    #[serde(default = "default_offer_item_max_chars")]
    pub offer_item_max_chars: usize,
    #[serde(default = "default_client_ip_max_chars")]
    pub client_ip_max_chars: usize,
    /// 空闲多久后停止计数对象并释放内存，0 表示常驻
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            max_clicks: default_max_clicks(),
            stats_window: default_stats_window(),
            mailbox_capacity: default_mailbox_capacity(),
            durable_timeout_ms: default_durable_timeout_ms(),
            url_max_chars: default_url_max_chars(),
            user_agent_max_chars: default_user_agent_max_chars(),
            offer_item_max_chars: default_offer_item_max_chars(),
            client_ip_max_chars: default_client_ip_max_chars(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default)]
    pub backend: FallbackBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_fallback_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            backend: FallbackBackend::default(),
            redis_url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
            timeout_ms: default_fallback_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    /// 为空时管理接口整体关闭（返回 404）
    #[serde(default)]
    pub admin_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,
    #[serde(default = "default_health_prefix")]
    pub health_prefix: String,
    #[serde(default = "default_dev_prefix")]
    pub dev_prefix: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            admin_prefix: default_admin_prefix(),
            health_prefix: default_health_prefix(),
            dev_prefix: default_dev_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DevConfig {
    /// 挂载 /dev/kv-clear 等本地调试接口（无鉴权）
    #[serde(default)]
    pub enable_routes: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: usize,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" 或 "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub enable_rotation: bool,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            enable_rotation: false,
            max_backups: default_max_backups(),
        }
    }
}

// Default value functions
fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "sqlite://clickledger.db".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_max_clicks() -> usize {
    200
}

fn default_stats_window() -> usize {
    10
}

fn default_mailbox_capacity() -> usize {
    1024
}

fn default_durable_timeout_ms() -> u64 {
    2000
}

fn default_url_max_chars() -> usize {
    256
}

fn default_user_agent_max_chars() -> usize {
    100
}

fn default_offer_item_max_chars() -> usize {
    128
}

fn default_client_ip_max_chars() -> usize {
    64
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "clickledger:fallback:".to_string()
}

fn default_fallback_timeout_ms() -> u64 {
    500
}

fn default_admin_prefix() -> String {
    "/admin".to_string()
}

fn default_health_prefix() -> String {
    "/health".to_string()
}

fn default_dev_prefix() -> String {
    "/dev".to_string()
}

fn default_cors_max_age() -> usize {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults_match_counter_contract() {
        let config = StaticConfig::default();
        assert_eq!(config.counter.max_clicks, 200);
        assert_eq!(config.counter.stats_window, 10);
        assert_eq!(config.counter.url_max_chars, 256);
        assert_eq!(config.counter.user_agent_max_chars, 100);
        assert_eq!(config.counter.offer_item_max_chars, 128);
        assert_eq!(config.counter.client_ip_max_chars, 64);
        assert_eq!(config.counter.idle_timeout_secs, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_parsing_accepts_aliases() {
        assert_eq!(
            DatabaseBackend::from_str("MariaDB").unwrap(),
            DatabaseBackend::Mysql
        );
        assert_eq!(
            DatabaseBackend::from_str("postgresql").unwrap(),
            DatabaseBackend::Postgres
        );
        assert_eq!(
            FallbackBackend::from_str("REDIS").unwrap(),
            FallbackBackend::Redis
        );
        assert!(FallbackBackend::from_str("memcached").is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_stats_window() {
        let mut config = StaticConfig::default();
        config.counter.stats_window = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relative_prefix() {
        let mut config = StaticConfig::default();
        config.routes.admin_prefix = "admin".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_config_round_trips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.fallback.backend, FallbackBackend::Memory);
    }
}
