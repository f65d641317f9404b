//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批次调度和执行单元的生命周期，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用
//! - 启动时加载钱包、代理、题库，完成 Agent 发现
//! - 组装每个执行单元的 InteractionFlow
//!
//! ### `batch_scheduler` - 批次调度器
//! - 按 `max_concurrency` 分批，每个钱包一个 tokio 任务
//! - 等待整批结束，批间等待，整轮结束后冷却
//! - 收集本轮出错的执行单元
//!
//! ### `unit_runner` - 执行单元
//! - 单个钱包的循环：额度检查 → 交互 → 冷却
//! - 达到每日上限后等到重置（或在 `until_quota` 模式下退出）
//!
//! ## 层次关系
//!
//! ```text
//! batch_scheduler (处理 Vec<Identity>)
//!     ↓
//! unit_runner (单个钱包的循环)
//!     ↓
//! workflow::InteractionFlow (单次交互)
//!     ↓
//! services (能力层：query / report / audit)
//!     ↓
//! infrastructure (基础设施：transport / rate governor / proxy rotation)
//! ```

pub mod app;
pub mod batch_scheduler;
pub mod unit_runner;

// 重新导出主要类型
pub use app::App;
pub use batch_scheduler::{BatchScheduler, CycleReport, SchedulerSettings};
pub use unit_runner::{run_unit, ExitReason, UnitSettings, UnitSummary};
