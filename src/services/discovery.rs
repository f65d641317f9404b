//! Agent 发现服务
//!
//! 启动时请求一次发现文档，解析成类型化的 Agent 列表

use crate::error::{AppResult, DiscoveryError};
use crate::infrastructure::{HttpTransport, TransportSettings};
use crate::models::{parse_discovery_document, DiscoveredAgents, QuestionBank};
use tracing::info;

pub struct AgentDiscovery {
    url: String,
    domain_key: String,
    transaction_agent_name: String,
}

impl AgentDiscovery {
    pub fn new(
        url: impl Into<String>,
        domain_key: impl Into<String>,
        transaction_agent_name: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            domain_key: domain_key.into(),
            transaction_agent_name: transaction_agent_name.into(),
        }
    }

    /// 拉取并解析发现文档（直连）
    pub async fn discover(&self, settings: &TransportSettings, bank: &QuestionBank) -> AppResult<DiscoveredAgents> {
        info!("🔎 正在检查 API...");
        let transport = HttpTransport::build(None, settings)?;
        let response = transport
            .get(&self.url, &[])
            .await
            .map_err(DiscoveryError::Fetch)?;

        let document = response
            .body
            .json()
            .ok_or_else(|| DiscoveryError::NotJson { url: self.url.clone() })?;

        let discovered =
            parse_discovery_document(document, &self.domain_key, bank, &self.transaction_agent_name)?;
        info!("✓ API 未变化，发现 {} 个 Agent", discovered.agents.len());
        Ok(discovered)
    }
}
