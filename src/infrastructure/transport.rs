//! HTTP 传输层 - 基础设施层
//!
//! 持有 reqwest 客户端（可绑定上游代理），只暴露 get / post / post_stream 能力

use crate::config::Config;
use crate::error::{ConfigError, NetworkError};
use crate::models::ProxyDescriptor;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::RequestBuilder;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

/// 构建客户端所需的参数
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub user_agent: String,
    pub timeout: Duration,
}

impl TransportSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 响应体：能解析成 JSON 就是 JSON，否则保留原始文本
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(JsonValue),
    Text(String),
}

impl ResponseBody {
    fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(json) => ResponseBody::Json(json),
            Err(_) => ResponseBody::Text(text),
        }
    }

    pub fn json(&self) -> Option<&JsonValue> {
        match self {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Text(_) => None,
        }
    }
}

/// 成功的 HTTP 响应
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseBody,
}

/// HTTP 传输
///
/// 职责：
/// - 持有 reqwest::Client（直连或经代理）
/// - 注入基础请求头与单次请求头
/// - 非 2xx 状态统一转换为 NetworkError::BadStatus（带状态码和响应体）
pub struct HttpTransport {
    client: reqwest::Client,
    proxy: Option<ProxyDescriptor>,
}

impl HttpTransport {
    /// 构建传输层；代理协议决定隧道类型（SOCKS 或 HTTP 正向代理）
    pub fn build(
        proxy: Option<&ProxyDescriptor>,
        settings: &TransportSettings,
    ) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout);

        if let Some(p) = proxy {
            debug!("使用代理构建客户端: {} (socks: {})", p, p.protocol.is_socks());
            let reqwest_proxy = reqwest::Proxy::all(p.to_url()).map_err(|e| {
                ConfigError::MalformedProxy {
                    raw: p.to_string(),
                    reason: e.to_string(),
                }
            })?;
            builder = builder.proxy(reqwest_proxy);
        } else {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(ConfigError::ClientBuildFailed)?;

        Ok(Self {
            client,
            proxy: proxy.cloned(),
        })
    }

    /// 当前绑定的代理
    pub fn proxy(&self) -> Option<&ProxyDescriptor> {
        self.proxy.as_ref()
    }

    pub async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, NetworkError> {
        let request = with_headers(self.client.get(url), headers);
        Self::execute(url, request).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<HttpResponse, NetworkError> {
        let request = with_headers(self.client.post(url).json(body), headers);
        Self::execute(url, request).await
    }

    /// 发送请求并返回尚未读取的响应，用于逐块读取事件流
    pub async fn post_stream<B: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<reqwest::Response, NetworkError> {
        let request = with_headers(self.client.post(url).json(body), headers);
        let response = send(url, request).await?;
        ensure_success(url, response).await
    }

    async fn execute(url: &str, request: RequestBuilder) -> Result<HttpResponse, NetworkError> {
        let response = ensure_success(url, send(url, request).await?).await?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|source| NetworkError::BodyReadFailed {
                url: url.to_string(),
                source,
            })?;

        Ok(HttpResponse {
            status,
            body: ResponseBody::from_text(text),
        })
    }
}

fn with_headers(mut request: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    request
}

async fn send(url: &str, request: RequestBuilder) -> Result<reqwest::Response, NetworkError> {
    request.send().await.map_err(|source| NetworkError::RequestFailed {
        url: url.to_string(),
        source,
    })
}

async fn ensure_success(url: &str, response: reqwest::Response) -> Result<reqwest::Response, NetworkError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(NetworkError::BadStatus {
        url: url.to_string(),
        status,
        body,
    })
}
