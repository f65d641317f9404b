//! 应用 - 编排层入口
//!
//! 启动时加载钱包、代理、题库并完成 Agent 发现，之后交给批次调度器无限循环。

use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{ProxyRotation, TransportSettings};
use crate::models::{load_identities, load_proxies, AgentDescriptor, Identity, QuestionBank};
use crate::orchestrator::batch_scheduler::{BatchScheduler, SchedulerSettings};
use crate::orchestrator::unit_runner::{run_unit, UnitSettings};
use crate::services::AgentDiscovery;
use crate::utils::logging::{log_loaded, log_startup};
use crate::workflow::{InteractionFlow, UnitCtx};

/// 应用主结构
pub struct App {
    config: Arc<Config>,
    identities: Vec<Identity>,
    rotation: Arc<ProxyRotation>,
    agents: Arc<[AgentDescriptor]>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> AppResult<Self> {
        log_startup(config.max_concurrency);

        let identities = load_identities(Path::new(&config.wallets_file)).await?;

        let proxies = if config.use_proxy {
            load_proxies(Path::new(&config.proxies_file)).await?
        } else {
            info!("🌐 代理已禁用");
            Vec::new()
        };

        let bank = QuestionBank::load(config.questions_file.as_deref())?;

        // 发现 Agent
        let discovery = AgentDiscovery::new(
            config.discovery_url.clone(),
            config.discovery_key.clone(),
            config.transaction_agent_name.clone(),
        );
        let discovered = discovery
            .discover(&TransportSettings::from_config(&config), &bank)
            .await?;
        if let Some(copyright) = &discovered.copyright {
            info!("📜 {}", copyright);
        }

        log_loaded(identities.len(), proxies.len(), discovered.agents.len());

        let rotation = Arc::new(ProxyRotation::new(proxies, config.use_proxy));

        Ok(Self {
            config: Arc::new(config),
            identities,
            rotation,
            agents: discovered.agents.into(),
        })
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn agents(&self) -> &[AgentDescriptor] {
        &self.agents
    }

    /// 运行直到收到停止信号，返回已开始的轮数
    pub async fn run(&self, stop: CancellationToken) -> usize {
        let scheduler = BatchScheduler::new(SchedulerSettings::from_config(&self.config));
        let unit_settings = UnitSettings::from_config(&self.config);

        let launch = |ctx: UnitCtx, unit_stop: CancellationToken| {
            // 每个执行单元拥有自己的传输层和频率控制器，代理游标共享
            let flow = InteractionFlow::new(&self.config, self.agents.clone(), self.rotation.clone());
            let settings = unit_settings.clone();
            async move {
                match flow {
                    Ok(flow) => run_unit(ctx, flow, settings, unit_stop).await,
                    Err(e) => Err(AppError::from(e)),
                }
            }
        };

        let cycles = scheduler.run_forever(&self.identities, launch, stop).await;
        info!("👋 已退出，共运行 {} 轮", cycles);
        cycles
    }
}
