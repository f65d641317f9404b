//! 使用量上报服务 - 业务能力层
//!
//! 只负责"上报一次问答"能力，频率限制时按指数退避重试

use crate::config::Config;
use crate::error::{NetworkError, RateLimitError};
use crate::infrastructure::{RateGovernor, RotatingTransport};
use crate::models::{AgentDescriptor, Identity};
use serde_json::{json, Value as JsonValue};
use tokio::time::sleep;
use tracing::{debug, warn};

const RATE_LIMIT_MARKER: &str = "Rate limit exceeded";

/// 使用量上报
///
/// 职责：
/// - 提交 wallet / agent / 问题 / 回答
/// - 被限流时重试（最多 max_retries 次），用尽后记为失败
/// - 其他网络错误轮换代理并记为失败
/// - 任何情况都不会中断执行单元
pub struct UsageReporter {
    url: String,
}

impl UsageReporter {
    pub fn new(config: &Config) -> Self {
        Self::with_url(&config.usage_report_url)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// 上报一次交互，返回是否被服务端接受
    pub async fn report(
        &self,
        identity: &Identity,
        agent: &AgentDescriptor,
        question: &str,
        answer: &str,
        transport: &RotatingTransport,
        governor: &RateGovernor,
    ) -> bool {
        let payload = build_payload(identity, agent, question, answer);
        let mut attempt: u32 = 0;

        loop {
            governor.await_slot().await;
            match transport.current().post(&self.url, &[], &payload).await {
                Ok(response) if response.status == 200 => return true,
                Ok(response) => {
                    warn!("⚠️ 上报返回非预期状态码: {}", response.status);
                    return false;
                }
                Err(e) if is_rate_limited(&e) => {
                    if attempt >= governor.max_retries() {
                        let err = RateLimitError {
                            endpoint: self.url.clone(),
                            attempts: attempt,
                        };
                        warn!("⚠️ {}，继续执行...", err);
                        return false;
                    }
                    let delay = governor.compute_backoff(attempt);
                    warn!(
                        "⏳ 检测到频率限制 (尝试 {}/{}), {:.1} 秒后重试...",
                        attempt + 1,
                        governor.max_retries(),
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("❌ 上报失败: {}", e);
                    transport.rotate();
                    return false;
                }
            }
        }
    }
}

fn build_payload(identity: &Identity, agent: &AgentDescriptor, question: &str, answer: &str) -> JsonValue {
    json!({
        "wallet_address": identity.as_str(),
        "agent_id": agent.agent_id,
        "request_text": question,
        "response_text": answer,
        "request_metadata": {},
    })
}

/// 检查是否是频率限制错误（HTTP 429，或错误体中包含限流标记）
pub fn is_rate_limited(err: &NetworkError) -> bool {
    if err.status() == Some(429) {
        return true;
    }
    let Some(body) = err.body() else {
        return false;
    };

    match serde_json::from_str::<JsonValue>(body) {
        Ok(json) => {
            let marked = json
                .get("error")
                .map(|e| match e {
                    JsonValue::String(s) => s.contains(RATE_LIMIT_MARKER),
                    other => other.to_string().contains(RATE_LIMIT_MARKER),
                })
                .unwrap_or(false);
            debug!("上报错误体: {}", json);
            marked
        }
        Err(_) => body.contains(RATE_LIMIT_MARKER),
    }
}
