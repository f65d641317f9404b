use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（启动阶段致命）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 网络传输错误（通过代理轮换恢复）
    #[error("网络错误: {0}")]
    Network(#[from] NetworkError),
    /// 上游明确的频率限制
    #[error("频率限制: {0}")]
    RateLimit(#[from] RateLimitError),
    /// 上游响应结构异常
    #[error("响应结构异常: {0}")]
    UpstreamSchema(#[from] UpstreamSchemaError),
    /// Agent 发现失败
    #[error("Agent 发现失败: {0}")]
    Discovery(#[from] DiscoveryError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 代理字符串格式错误
    #[error("代理格式错误 '{raw}': {reason}")]
    MalformedProxy { raw: String, reason: String },
    /// 钱包列表为空
    #[error("钱包列表为空: {path}")]
    NoIdentities { path: String },
    /// 读取源文件失败
    #[error("无法读取 {path}: {source}")]
    SourceUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端构建失败: {0}")]
    ClientBuildFailed(#[source] reqwest::Error),
}

/// 网络传输错误
#[derive(Debug, Error)]
pub enum NetworkError {
    /// 请求未能完成（连接、超时、代理握手等）
    #[error("请求失败 ({url}): {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 上游返回非成功状态码
    #[error("上游返回状态码 {status} ({url}): {body}")]
    BadStatus {
        url: String,
        status: u16,
        body: String,
    },
    /// 读取响应体失败
    #[error("读取响应失败 ({url}): {source}")]
    BodyReadFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl NetworkError {
    /// 上游状态码（如果有）
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::BadStatus { status, .. } => Some(*status),
            NetworkError::RequestFailed { source, .. } | NetworkError::BodyReadFailed { source, .. } => {
                source.status().map(|s| s.as_u16())
            }
        }
    }

    /// 上游响应体（如果有）
    pub fn body(&self) -> Option<&str> {
        match self {
            NetworkError::BadStatus { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

/// 频率限制错误
#[derive(Debug, Error)]
#[error("请求过于频繁 ({endpoint}), 已重试 {attempts} 次")]
pub struct RateLimitError {
    pub endpoint: String,
    pub attempts: u32,
}

/// 上游响应结构异常
#[derive(Debug, Error)]
pub enum UpstreamSchemaError {
    /// 缺少期望字段
    #[error("缺少字段 '{field}' ({endpoint})")]
    MissingField { endpoint: String, field: String },
}

/// Agent 发现错误
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// 发现文档请求失败
    #[error("无法获取发现文档: {0}")]
    Fetch(#[from] NetworkError),
    /// 返回内容不是 JSON
    #[error("发现文档不是 JSON ({url})")]
    NotJson { url: String },
    /// 文档中没有指定的域
    #[error("发现文档中不存在域 '{key}'")]
    MissingDomain { key: String },
    /// 没有任何可用 Agent
    #[error("域 '{key}' 下没有可用的 Agent")]
    NoAgents { key: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建上游字段缺失错误
    pub fn missing_field(endpoint: impl Into<String>, field: impl Into<String>) -> Self {
        AppError::UpstreamSchema(UpstreamSchemaError::MissingField {
            endpoint: endpoint.into(),
            field: field.into(),
        })
    }

    /// 是否为可通过轮换代理恢复的网络错误
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::Network(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
