//! Agent 描述与发现文档解析
//!
//! 发现文档格式：
//!
//! ```json
//! { "<domain>": { "apis": [ { "api": "https://...", "agent_id": "...", "name": "..." } ] },
//!   "copyright": "..." }
//! ```

use crate::error::DiscoveryError;
use crate::models::QuestionBank;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::warn;
use url::Url;

/// Agent 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// 普通问答
    Chat,
    /// 用最新链上交易哈希作为问题
    TransactionAnalyzer,
}

/// Agent 描述，启动后只读共享
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDescriptor {
    pub endpoint_url: String,
    pub agent_id: String,
    pub display_name: String,
    pub candidate_questions: Vec<String>,
    pub kind: AgentKind,
}

/// 发现文档解析结果
#[derive(Debug, Clone)]
pub struct DiscoveredAgents {
    pub agents: Vec<AgentDescriptor>,
    pub copyright: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAgentEntry {
    api: Option<String>,
    agent_id: Option<String>,
    name: Option<String>,
}

/// 解析发现文档
///
/// 不合法的条目会被跳过并打印警告；域不存在或没有任何合法条目时返回错误。
pub fn parse_discovery_document(
    document: &JsonValue,
    domain_key: &str,
    bank: &QuestionBank,
    transaction_agent_name: &str,
) -> Result<DiscoveredAgents, DiscoveryError> {
    let domain = document
        .get(domain_key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| DiscoveryError::MissingDomain {
            key: domain_key.to_string(),
        })?;

    let entries = domain
        .get("apis")
        .and_then(|v| v.as_array())
        .map(|v| v.as_slice())
        .unwrap_or_default();

    let mut agents = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        match validate_entry(entry, bank, transaction_agent_name) {
            Ok(agent) => agents.push(agent),
            Err(reason) => warn!("⚠️ 跳过第 {} 个 Agent 条目: {}", idx + 1, reason),
        }
    }

    if agents.is_empty() {
        return Err(DiscoveryError::NoAgents {
            key: domain_key.to_string(),
        });
    }

    let copyright = document
        .get("copyright")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Ok(DiscoveredAgents { agents, copyright })
}

fn validate_entry(
    entry: &JsonValue,
    bank: &QuestionBank,
    transaction_agent_name: &str,
) -> Result<AgentDescriptor, String> {
    let raw: RawAgentEntry =
        serde_json::from_value(entry.clone()).map_err(|e| format!("结构错误: {}", e))?;

    let api = raw.api.filter(|s| !s.trim().is_empty()).ok_or("缺少 api")?;
    let url = Url::parse(api.trim()).map_err(|e| format!("api 地址无效 '{}': {}", api, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("api 协议无效 '{}'", url.scheme()));
    }
    let agent_id = raw.agent_id.filter(|s| !s.trim().is_empty()).ok_or("缺少 agent_id")?;
    let name = raw.name.filter(|s| !s.trim().is_empty()).ok_or("缺少 name")?;

    let kind = if name == transaction_agent_name {
        AgentKind::TransactionAnalyzer
    } else {
        AgentKind::Chat
    };

    let candidate_questions = bank.for_agent(&name);
    if candidate_questions.is_empty() && kind == AgentKind::Chat {
        return Err(format!("Agent '{}' 没有可用的问题", name));
    }

    Ok(AgentDescriptor {
        endpoint_url: url.to_string(),
        agent_id,
        display_name: name,
        candidate_questions,
        kind,
    })
}
