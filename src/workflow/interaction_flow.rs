//! 单次交互流程 - 流程层
//!
//! 核心职责：定义"一次交互"的完整处理流程
//!
//! 流程顺序：
//! 1. 随机选择 Agent
//! 2. 频率控制 → 提问（缓冲或流式）
//! 3. 上报使用量
//! 4. 更新会话统计，成功时追加交互记录

use chrono::Utc;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ConfigError;
use crate::infrastructure::{ProxyRotation, RateGovernor, RotatingTransport, TransportSettings};
use crate::models::AgentDescriptor;
use crate::services::{AgentQueryClient, AuditWriter, UsageReporter};
use crate::utils::truncate_text;
use crate::workflow::session::Session;
use crate::workflow::unit_ctx::UnitCtx;

/// 交互结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionResult {
    pub agent_name: String,
    pub question: String,
    pub answer: String,
    /// 提问成功且上报被接受
    pub success: bool,
}

/// 单次交互流程
///
/// - 编排 提问 → 上报 → 记分
/// - 持有执行单元自己的传输层和频率控制器
/// - 任何失败都记为一次失败交互，不向上传播
pub struct InteractionFlow {
    agents: Arc<[AgentDescriptor]>,
    query_client: AgentQueryClient,
    reporter: UsageReporter,
    audit: Option<AuditWriter>,
    transport: RotatingTransport,
    governor: RateGovernor,
}

impl InteractionFlow {
    /// 为一个执行单元创建流程
    pub fn new(
        config: &Config,
        agents: Arc<[AgentDescriptor]>,
        rotation: Arc<ProxyRotation>,
    ) -> Result<Self, ConfigError> {
        let transport = RotatingTransport::new(rotation, TransportSettings::from_config(config))?;
        Ok(Self::from_parts(
            agents,
            AgentQueryClient::new(config),
            UsageReporter::new(config),
            Some(AuditWriter::new(&config.interaction_log_file)),
            transport,
            RateGovernor::new(&config.rate_limit),
        ))
    }

    pub fn from_parts(
        agents: Arc<[AgentDescriptor]>,
        query_client: AgentQueryClient,
        reporter: UsageReporter,
        audit: Option<AuditWriter>,
        transport: RotatingTransport,
        governor: RateGovernor,
    ) -> Self {
        Self {
            agents,
            query_client,
            reporter,
            audit,
            transport,
            governor,
        }
    }

    pub fn transport(&self) -> &RotatingTransport {
        &self.transport
    }

    /// 执行一次交互并更新会话
    pub async fn run_once(&self, ctx: &UnitCtx, session: &mut Session) -> InteractionResult {
        let Some(agent) = self.agents.choose(&mut rand::thread_rng()).cloned() else {
            warn!("{} ⚠️ 没有可用的 Agent", ctx);
            session.record_interaction("", false, Utc::now());
            return InteractionResult {
                agent_name: String::new(),
                question: String::new(),
                answer: String::new(),
                success: false,
            };
        };

        if let Some(proxy) = self.transport.current_proxy() {
            info!("{} 🌐 使用代理: {}", ctx, proxy);
        }

        // ========== 提问 ==========
        let outcome = self.query_client.query(&agent, &self.transport, &self.governor).await;
        info!(
            "{} 🤖 AI 系统: {} | Agent ID: {} | 问题: {}",
            ctx, agent.display_name, agent.agent_id, outcome.question
        );

        // ========== 上报 ==========
        let success = if outcome.success {
            info!("{} 💡 回答: {}", ctx, truncate_text(&outcome.answer, 120));
            info!("{} 📝 正在记录交互...", ctx);
            self.reporter
                .report(
                    &session.identity,
                    &agent,
                    &outcome.question,
                    &outcome.answer,
                    &self.transport,
                    &self.governor,
                )
                .await
        } else {
            false
        };

        // ========== 记分 ==========
        let now = Utc::now();
        session.record_interaction(&agent.display_name, success, now);

        if success {
            info!("{} ✅ 交互记录成功", ctx);
            self.write_audit(ctx, session, &agent, &outcome.question).await;
        } else {
            warn!("{} ⚠️ 交互记录失败", ctx);
        }

        InteractionResult {
            agent_name: agent.display_name,
            question: outcome.question,
            answer: outcome.answer,
            success,
        }
    }

    async fn write_audit(&self, ctx: &UnitCtx, session: &Session, agent: &AgentDescriptor, question: &str) {
        let Some(audit) = &self.audit else {
            return;
        };
        let at = session.statistics.last_interaction_time.unwrap_or_else(Utc::now);
        if let Err(e) = audit
            .append(at, session.identity.as_str(), &agent.display_name, question)
            .await
        {
            warn!("{} ⚠️ 写入交互记录失败: {}", ctx, e);
        }
    }
}
