//! 批次调度器 - 编排层
//!
//! ## 职责
//!
//! 把全部钱包按 `max_concurrency` 分批，每个钱包一个独立的 tokio 任务（执行单元），
//! 等整批结束再开始下一批；全部钱包处理完后冷却，然后从第一个钱包重新开始，
//! 直到收到停止信号。
//!
//! ## 状态流转
//!
//! ```text
//! Idle → Dispatching → AwaitingBatch → (批间等待) → Dispatching → … → Cooldown → Idle
//! ```
//!
//! ## 设计特点
//!
//! - **隔离**：单个执行单元出错或 panic 只记入本轮错误列表，不影响同批其他单元
//! - **并发上限**：分批之外再用 Semaphore 限制同时运行的单元数量
//! - **向下委托**：具体做什么由 `launch` 闭包决定，调度器只管调度和统计

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::Identity;
use crate::orchestrator::unit_runner::UnitSummary;
use crate::utils::logging::{log_batch_complete, log_batch_start, log_cycle_complete};
use crate::utils::sleep_or_cancel;
use crate::workflow::UnitCtx;

/// 调度参数
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub max_concurrency: usize,
    pub inter_batch_delay: Duration,
    pub cycle_cooldown: Duration,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1),
            inter_batch_delay: Duration::from_secs(config.inter_batch_delay_secs),
            cycle_cooldown: Duration::from_secs(config.cycle_cooldown_minutes * 60),
        }
    }
}

/// 一轮调度的结果
#[derive(Debug, Default, Clone)]
pub struct CycleReport {
    /// 每批实际启动的执行单元数量
    pub batch_sizes: Vec<usize>,
    /// 正常退出的执行单元数量
    pub completed: usize,
    /// 本轮出错或异常终止的执行单元
    pub errors: Vec<String>,
}

/// 批次调度器
pub struct BatchScheduler {
    settings: SchedulerSettings,
    semaphore: Arc<Semaphore>,
}

impl BatchScheduler {
    pub fn new(mut settings: SchedulerSettings) -> Self {
        settings.max_concurrency = settings.max_concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(settings.max_concurrency));
        Self { settings, semaphore }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// 处理一轮全部钱包
    pub async fn run_cycle<F, Fut>(
        &self,
        identities: &[Identity],
        launch: &F,
        stop: &CancellationToken,
    ) -> CycleReport
    where
        F: Fn(UnitCtx, CancellationToken) -> Fut,
        Fut: Future<Output = AppResult<UnitSummary>> + Send + 'static,
    {
        let total = identities.len();
        let batch_size = self.settings.max_concurrency;
        let total_batches = total.div_ceil(batch_size);
        let mut report = CycleReport::default();

        for (batch_idx, batch) in identities.chunks(batch_size).enumerate() {
            if stop.is_cancelled() {
                break;
            }

            let batch_num = batch_idx + 1;
            let batch_start = batch_idx * batch_size;
            log_batch_start(batch_num, total_batches, batch_start + 1, batch_start + batch.len(), total);

            // ========== Dispatching ==========
            let mut handles = Vec::with_capacity(batch.len());
            for (idx, identity) in batch.iter().enumerate() {
                let ctx = UnitCtx::new(identity.clone(), batch_start + idx + 1);
                let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                    error!("{} 并发控制已关闭，跳过", ctx);
                    report.errors.push(format!("{} 未能启动", ctx));
                    continue;
                };

                let unit = launch(ctx.clone(), stop.clone());
                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    unit.await
                });
                handles.push((ctx, handle));
            }
            report.batch_sizes.push(handles.len());

            // ========== AwaitingBatch ==========
            let mut completed = 0;
            for (ctx, handle) in handles {
                match handle.await {
                    Ok(Ok(_)) => completed += 1,
                    Ok(Err(e)) => {
                        error!("{} ❌ 执行单元出错: {}", ctx, e);
                        report.errors.push(format!("{} {}", ctx, e));
                    }
                    Err(e) => {
                        error!("{} 💥 执行单元异常终止: {}", ctx, e);
                        report.errors.push(format!("{} 异常终止: {}", ctx, e));
                    }
                }
            }
            report.completed += completed;
            log_batch_complete(batch_num, completed, batch.len());

            if batch_start + batch.len() < total {
                info!("⏳ {} 秒后开始下一批...", self.settings.inter_batch_delay.as_secs());
                if sleep_or_cancel(self.settings.inter_batch_delay, stop).await {
                    break;
                }
            }
        }

        report
    }

    /// 循环处理直到收到停止信号，返回已开始的轮数
    pub async fn run_forever<F, Fut>(&self, identities: &[Identity], launch: F, stop: CancellationToken) -> usize
    where
        F: Fn(UnitCtx, CancellationToken) -> Fut,
        Fut: Future<Output = AppResult<UnitSummary>> + Send + 'static,
    {
        let mut cycle = 0;
        loop {
            if stop.is_cancelled() {
                break;
            }
            cycle += 1;
            info!("🔁 开始第 {} 轮", cycle);

            let report = self.run_cycle(identities, &launch, &stop).await;
            if stop.is_cancelled() {
                info!("🛑 第 {} 轮被停止: 正常退出 {} 个执行单元", cycle, report.completed);
                break;
            }

            log_cycle_complete(
                cycle,
                report.completed,
                &report.errors,
                self.settings.cycle_cooldown.as_secs() / 60,
            );
            if sleep_or_cancel(self.settings.cycle_cooldown, &stop).await {
                break;
            }
        }
        cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::orchestrator::unit_runner::ExitReason;
    use crate::workflow::Session;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Instant};

    fn identities(n: usize) -> Vec<Identity> {
        (0..n).map(|i| Identity::new(format!("0x{:040x}", i))).collect()
    }

    fn settings(max_concurrency: usize) -> SchedulerSettings {
        SchedulerSettings {
            max_concurrency,
            inter_batch_delay: Duration::from_secs(3),
            cycle_cooldown: Duration::from_secs(3600),
        }
    }

    fn summary(ctx: &UnitCtx) -> UnitSummary {
        UnitSummary {
            session: Session::new(ctx.identity.clone(), ctx.session_id, Utc::now()),
            reason: ExitReason::QuotaReached,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_batches_and_pacing() {
        let scheduler = BatchScheduler::new(settings(2));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let launch = {
            let running = running.clone();
            let peak = peak.clone();
            move |ctx: UnitCtx, _stop: CancellationToken| {
                let running = running.clone();
                let peak = peak.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_secs(1)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(summary(&ctx))
                }
            }
        };

        let start = Instant::now();
        let report = scheduler
            .run_cycle(&identities(5), &launch, &CancellationToken::new())
            .await;

        assert_eq!(report.batch_sizes, vec![2, 2, 1]);
        assert_eq!(report.completed, 5);
        assert!(report.errors.is_empty());
        assert!(peak.load(Ordering::SeqCst) <= 2);
        // 3 批各 1 秒 + 2 次批间等待
        assert!(start.elapsed() >= Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_failures_are_isolated() {
        let scheduler = BatchScheduler::new(settings(5));
        let launch = |ctx: UnitCtx, _stop: CancellationToken| async move {
            match ctx.session_id {
                2 => panic!("unit blew up"),
                3 => Err(AppError::missing_field("/api/test", "choices")),
                _ => Ok(summary(&ctx)),
            }
        };

        let report = scheduler
            .run_cycle(&identities(5), &launch, &CancellationToken::new())
            .await;

        assert_eq!(report.batch_sizes, vec![5]);
        assert_eq!(report.completed, 3);
        assert_eq!(report.errors.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_cooldown_ends_run() {
        let scheduler = BatchScheduler::new(settings(2));
        let stop = CancellationToken::new();
        let trigger = stop.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(60)).await;
            trigger.cancel();
        });

        let launched = Arc::new(AtomicUsize::new(0));
        let counter = launched.clone();
        let start = Instant::now();
        let cycles = scheduler
            .run_forever(
                &identities(3),
                move |ctx: UnitCtx, _stop: CancellationToken| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(summary(&ctx)) }
                },
                stop,
            )
            .await;

        assert_eq!(cycles, 1);
        assert_eq!(launched.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_before_start_dispatches_nothing() {
        let scheduler = BatchScheduler::new(settings(2));
        let stop = CancellationToken::new();
        stop.cancel();

        let launch = |ctx: UnitCtx, _stop: CancellationToken| async move { Ok(summary(&ctx)) };
        let report = scheduler.run_cycle(&identities(4), &launch, &stop).await;
        assert!(report.batch_sizes.is_empty());
        assert_eq!(report.completed, 0);
    }
}
