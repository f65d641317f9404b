//! 代理描述
//!
//! 支持两种格式：
//! - URL 形式：`scheme://[user:pass@]host:port`
//! - 冒号分隔：`scheme:host:port[:user:pass]`

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// 代理协议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
    /// 由代理端解析域名
    Socks5h,
}

impl ProxyProtocol {
    /// 获取 URL scheme
    pub fn scheme(self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
            ProxyProtocol::Socks5h => "socks5h",
        }
    }

    pub fn is_socks(self) -> bool {
        matches!(self, ProxyProtocol::Socks5 | ProxyProtocol::Socks5h)
    }

    /// 从 scheme 解析协议，`socks` 视为 `socks5`
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => Some(ProxyProtocol::Http),
            "https" => Some(ProxyProtocol::Https),
            "socks" | "socks5" => Some(ProxyProtocol::Socks5),
            "socks5h" => Some(ProxyProtocol::Socks5h),
            _ => None,
        }
    }
}

/// 代理认证信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

/// 代理描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    pub protocol: ProxyProtocol,
    pub host: String,
    pub port: u16,
    pub credentials: Option<ProxyCredentials>,
}

impl ProxyDescriptor {
    /// 生成完整代理 URL（包含认证信息），用于构建 HTTP 客户端
    pub fn to_url(&self) -> String {
        match &self.credentials {
            Some(c) => format!(
                "{}://{}:{}@{}:{}",
                self.protocol.scheme(),
                c.username,
                c.password,
                self.host,
                self.port
            ),
            None => format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port),
        }
    }

    fn parse_url_form(raw: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(raw).map_err(|e| malformed(raw, e.to_string()))?;
        let protocol = ProxyProtocol::from_scheme(url.scheme())
            .ok_or_else(|| malformed(raw, format!("不支持的协议 '{}'", url.scheme())))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| malformed(raw, "缺少主机"))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| malformed(raw, "缺少端口"))?;
        let credentials = if url.username().is_empty() {
            None
        } else {
            Some(ProxyCredentials {
                username: url.username().to_string(),
                password: url.password().unwrap_or_default().to_string(),
            })
        };

        Ok(Self {
            protocol,
            host,
            port,
            credentials,
        })
    }

    fn parse_colon_form(raw: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = raw.split(':').collect();
        let (scheme, host, port, credentials) = match parts.as_slice() {
            [scheme, host, port] => (*scheme, *host, *port, None),
            [scheme, host, port, user, pass] => (
                *scheme,
                *host,
                *port,
                Some(ProxyCredentials {
                    username: user.to_string(),
                    password: pass.to_string(),
                }),
            ),
            _ => return Err(malformed(raw, "字段数量应为 3 或 5")),
        };

        let protocol = ProxyProtocol::from_scheme(scheme)
            .ok_or_else(|| malformed(raw, format!("不支持的协议 '{}'", scheme)))?;
        let host = host.trim_start_matches('/');
        if host.is_empty() {
            return Err(malformed(raw, "缺少主机"));
        }

        Ok(Self {
            protocol,
            host: host.to_string(),
            port: parse_port(raw, port)?,
            credentials,
        })
    }
}

impl FromStr for ProxyDescriptor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.contains("://") {
            Self::parse_url_form(raw)
        } else {
            Self::parse_colon_form(raw)
        }
    }
}

/// 日志显示用，不包含认证信息
impl fmt::Display for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }
}

fn parse_port(raw: &str, port: &str) -> Result<u16, ConfigError> {
    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(malformed(raw, format!("端口无效 '{}'", port))),
    }
}

fn malformed(raw: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::MalformedProxy {
        raw: raw.to_string(),
        reason: reason.into(),
    }
}
