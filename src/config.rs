use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// 配置文件默认路径
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// 执行单元的运行模式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitMode {
    /// 持续运行，达到每日上限后等待重置
    Continuous,
    /// 达到每日上限后退出，让调度器继续处理下一批
    UntilQuota,
}

impl std::str::FromStr for UnitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continuous" => Ok(UnitMode::Continuous),
            "until_quota" => Ok(UnitMode::UntilQuota),
            other => Err(format!("未知的运行模式: {}", other)),
        }
    }
}

/// 频率控制配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// 频率限制时的最大重试次数
    pub max_retries: u32,
    /// 退避基础延迟（毫秒）
    pub base_delay_ms: u64,
    /// 退避最大延迟（毫秒）
    pub max_delay_ms: u64,
    /// 每分钟最多请求数
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 2000,
            max_delay_ms: 10000,
            requests_per_minute: 15,
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 同时运行的钱包数量
    pub max_concurrency: usize,
    /// 批次之间的间隔（秒）
    pub inter_batch_delay_secs: u64,
    /// 全部钱包处理完后的休眠时间（分钟）
    pub cycle_cooldown_minutes: u64,
    /// 执行单元运行模式
    pub unit_mode: UnitMode,
    /// 每次交互后的随机冷却区间（毫秒）
    pub cooldown_min_ms: u64,
    pub cooldown_max_ms: u64,
    /// 钱包列表文件
    pub wallets_file: String,
    /// 代理列表文件
    pub proxies_file: String,
    /// 是否启用代理
    pub use_proxy: bool,
    /// 是否使用流式响应
    pub stream_responses: bool,
    /// 自定义题库文件（可选）
    pub questions_file: Option<String>,
    /// 成功交互记录文件
    pub interaction_log_file: String,
    /// 运行日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 远程接口 ---
    pub discovery_url: String,
    pub discovery_key: String,
    pub usage_report_url: String,
    pub tx_feed_url: String,
    /// 使用链上交易作为问题的 Agent 名称
    pub transaction_agent_name: String,
    // --- HTTP ---
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub rate_limit: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            inter_batch_delay_secs: 3,
            cycle_cooldown_minutes: 60,
            unit_mode: UnitMode::Continuous,
            cooldown_min_ms: 1000,
            cooldown_max_ms: 3000,
            wallets_file: "wallets.txt".to_string(),
            proxies_file: "proxies.txt".to_string(),
            use_proxy: true,
            stream_responses: true,
            questions_file: None,
            interaction_log_file: "interactions.txt".to_string(),
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
            discovery_url: "https://raw.githubusercontent.com/Hunga9k50doker/APIs-checking/refs/heads/main/endpoints.json".to_string(),
            discovery_key: "kite".to_string(),
            usage_report_url: "https://quests-usage-dev.prod.zettablock.com/api/report_usage".to_string(),
            tx_feed_url: "https://testnet.kitescan.ai/api/v2/transactions".to_string(),
            transaction_agent_name: "Transaction Analyzer".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            request_timeout_secs: 60,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Config {
    /// 加载配置：先读 config.toml（可选），再用环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = Self::from_file(Path::new(&path))?.unwrap_or_default();
        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取配置，文件不存在时返回 None
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::SourceUnreadable {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string()).map(Some)
    }

    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: origin.to_string(),
            source,
        })
    }

    /// 环境变量覆盖
    pub fn with_env_overrides(self) -> Self {
        let default = self;
        Self {
            max_concurrency: env_parse("MAX_CONCURRENCY").unwrap_or(default.max_concurrency),
            inter_batch_delay_secs: env_parse("INTER_BATCH_DELAY_SECS").unwrap_or(default.inter_batch_delay_secs),
            cycle_cooldown_minutes: env_parse("CYCLE_COOLDOWN_MINUTES").unwrap_or(default.cycle_cooldown_minutes),
            unit_mode: env_parse("UNIT_MODE").unwrap_or(default.unit_mode),
            cooldown_min_ms: env_parse("COOLDOWN_MIN_MS").unwrap_or(default.cooldown_min_ms),
            cooldown_max_ms: env_parse("COOLDOWN_MAX_MS").unwrap_or(default.cooldown_max_ms),
            wallets_file: std::env::var("WALLETS_FILE").unwrap_or(default.wallets_file),
            proxies_file: std::env::var("PROXIES_FILE").unwrap_or(default.proxies_file),
            use_proxy: env_parse("USE_PROXY").unwrap_or(default.use_proxy),
            stream_responses: env_parse("STREAM_RESPONSES").unwrap_or(default.stream_responses),
            questions_file: std::env::var("QUESTIONS_FILE").ok().or(default.questions_file),
            interaction_log_file: std::env::var("INTERACTION_LOG_FILE").unwrap_or(default.interaction_log_file),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            discovery_url: std::env::var("DISCOVERY_URL").unwrap_or(default.discovery_url),
            discovery_key: std::env::var("DISCOVERY_KEY").unwrap_or(default.discovery_key),
            usage_report_url: std::env::var("USAGE_REPORT_URL").unwrap_or(default.usage_report_url),
            tx_feed_url: std::env::var("TX_FEED_URL").unwrap_or(default.tx_feed_url),
            transaction_agent_name: std::env::var("TRANSACTION_AGENT_NAME").unwrap_or(default.transaction_agent_name),
            user_agent: std::env::var("USER_AGENT").unwrap_or(default.user_agent),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(default.request_timeout_secs),
            rate_limit: RateLimitConfig {
                max_retries: env_parse("MAX_RETRIES").unwrap_or(default.rate_limit.max_retries),
                base_delay_ms: env_parse("BASE_DELAY_MS").unwrap_or(default.rate_limit.base_delay_ms),
                max_delay_ms: env_parse("MAX_DELAY_MS").unwrap_or(default.rate_limit.max_delay_ms),
                requests_per_minute: env_parse("REQUESTS_PER_MINUTE").unwrap_or(default.rate_limit.requests_per_minute),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
