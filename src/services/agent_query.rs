//! Agent 问答服务 - 业务能力层
//!
//! 只负责"向一个 Agent 提问并拿到完整回答"能力，不关心积分和上报
//!
//! 支持两种响应模式：
//! - 缓冲：一次性返回 `choices[0].message.content`
//! - 流式：逐帧累加 `choices[0].delta.content`，直到 `data: [DONE]`

use crate::config::Config;
use crate::error::{AppError, AppResult, NetworkError};
use crate::infrastructure::{HttpTransport, RateGovernor, RotatingTransport};
use crate::models::{AgentDescriptor, AgentKind};
use crate::services::sse::SseAccumulator;
use crate::services::tx_feed::TxFeed;
use futures::StreamExt;
use rand::seq::SliceRandom;
use serde_json::json;
use tracing::{debug, warn};

/// 响应模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Buffered,
    Streamed,
}

/// 一次提问的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub question: String,
    pub answer: String,
    pub success: bool,
}

impl QueryOutcome {
    fn failed(question: String) -> Self {
        Self {
            question,
            answer: String::new(),
            success: false,
        }
    }
}

/// Agent 问答客户端
///
/// 职责：
/// - 随机选题（交易分析 Agent 使用最新交易哈希作为题目）
/// - 经频率控制和可轮换代理发送请求
/// - 网络失败时轮换代理，返回空回答，不中断运行
pub struct AgentQueryClient {
    mode: ResponseMode,
    tx_feed: TxFeed,
}

impl AgentQueryClient {
    pub fn new(config: &Config) -> Self {
        let mode = if config.stream_responses {
            ResponseMode::Streamed
        } else {
            ResponseMode::Buffered
        };
        Self::with_mode(mode, &config.tx_feed_url)
    }

    pub fn with_mode(mode: ResponseMode, tx_feed_url: &str) -> Self {
        Self {
            mode,
            tx_feed: TxFeed::new(tx_feed_url),
        }
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    /// 向 Agent 提一个随机问题
    pub async fn query(
        &self,
        agent: &AgentDescriptor,
        transport: &RotatingTransport,
        governor: &RateGovernor,
    ) -> QueryOutcome {
        let candidates = self.candidate_questions(agent, transport, governor).await;
        let Some(question) = pick_question(&candidates) else {
            warn!("⚠️ Agent {} 没有可用的问题", agent.display_name);
            return QueryOutcome::failed(String::new());
        };

        governor.await_slot().await;
        let http = transport.current();
        let result = match self.mode {
            ResponseMode::Buffered => query_buffered(&http, agent, &question).await,
            ResponseMode::Streamed => query_streamed(&http, agent, &question).await,
        };

        match result {
            Ok(answer) if !answer.is_empty() => QueryOutcome {
                question,
                answer,
                success: true,
            },
            Ok(_) => {
                warn!("⚠️ Agent {} 返回了空回答", agent.display_name);
                QueryOutcome::failed(question)
            }
            Err(e) => {
                warn!("❌ 提问失败 ({}): {}", agent.display_name, e);
                if e.is_network() {
                    transport.rotate();
                }
                QueryOutcome::failed(question)
            }
        }
    }

    async fn candidate_questions(
        &self,
        agent: &AgentDescriptor,
        transport: &RotatingTransport,
        governor: &RateGovernor,
    ) -> Vec<String> {
        if agent.kind == AgentKind::TransactionAnalyzer {
            let hashes = self.tx_feed.recent_hashes(transport, governor).await;
            if !hashes.is_empty() {
                return transaction_questions(&hashes);
            }
        }
        agent.candidate_questions.clone()
    }
}

/// 把交易哈希转换成问题
pub fn transaction_questions(hashes: &[String]) -> Vec<String> {
    hashes
        .iter()
        .map(|hash| format!("Analyze this transaction in detail: {}", hash))
        .collect()
}

fn pick_question(candidates: &[String]) -> Option<String> {
    candidates.choose(&mut rand::thread_rng()).cloned()
}

async fn query_buffered(http: &HttpTransport, agent: &AgentDescriptor, question: &str) -> AppResult<String> {
    let payload = json!({ "message": question, "stream": false });
    let response = http.post(&agent.endpoint_url, &[], &payload).await?;

    let content = response
        .body
        .json()
        .and_then(|body| body.pointer("/choices/0/message/content"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::missing_field(&agent.endpoint_url, "choices[0].message.content"))?;

    Ok(content.trim().to_string())
}

async fn query_streamed(http: &HttpTransport, agent: &AgentDescriptor, question: &str) -> AppResult<String> {
    let payload = json!({ "message": question, "stream": true });
    let response = http
        .post_stream(&agent.endpoint_url, &[("Accept", "text/event-stream")], &payload)
        .await?;

    let mut accumulator = SseAccumulator::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| NetworkError::BodyReadFailed {
            url: agent.endpoint_url.clone(),
            source,
        })?;
        accumulator.feed(&chunk);
        if accumulator.is_done() {
            break;
        }
    }

    if accumulator.skipped_frames() > 0 {
        debug!("流式响应中跳过了 {} 个无法解析的帧", accumulator.skipped_frames());
    }
    Ok(accumulator.finish().trim().to_string())
}
