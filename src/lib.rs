//! # Agent Points Runner
//!
//! 多钱包并发的 AI Agent 积分交互程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有出站网络资源，只暴露能力
//! - `HttpTransport` - 直连或经代理的 HTTP 客户端
//! - `RateGovernor` - 请求最小间隔与指数退避
//! - `ProxyRotation` / `RotatingTransport` - 代理池轮换，失败后重建传输层
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单次请求
//! - `AgentQueryClient` - 向 Agent 提问（缓冲或流式）
//! - `UsageReporter` - 上报使用量，频率限制时退避重试
//! - `AgentDiscovery` - 启动时发现可用 Agent
//! - `AuditWriter` - 追加写交互记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次交互"的完整处理流程
//! - `UnitCtx` - 上下文封装（session_id + 钱包）
//! - `Session` - 每日积分额度与统计
//! - `InteractionFlow` - 流程编排（query → report → session → audit）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_scheduler` - 分批调度执行单元，批间等待，整轮冷却
//! - `orchestrator/unit_runner` - 单个钱包的交互循环
//! - `orchestrator/app` - 启动加载与组装
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, UnitMode};
pub use error::{AppError, AppResult};
pub use models::{AgentDescriptor, Identity, ProxyDescriptor};
pub use orchestrator::{App, BatchScheduler, CycleReport};
pub use workflow::{InteractionFlow, Session, UnitCtx};
