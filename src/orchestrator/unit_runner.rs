//! 执行单元 - 编排层
//!
//! 一个钱包一个执行单元，循环执行交互直到收到停止信号
//! （`until_quota` 模式下达到每日上限也会退出）。
//!
//! 每次循环顶部检查停止信号；进行中的交互会先完成再退出。

use chrono::Utc;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{Config, UnitMode};
use crate::error::AppResult;
use crate::utils::logging::fmt_time;
use crate::utils::sleep_or_cancel;
use crate::workflow::{InteractionFlow, QuotaStatus, Session, UnitCtx, MAX_DAILY_POINTS, POINTS_PER_INTERACTION};

/// 执行单元参数
#[derive(Debug, Clone)]
pub struct UnitSettings {
    pub mode: UnitMode,
    pub cooldown_min: Duration,
    pub cooldown_max: Duration,
}

impl UnitSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.unit_mode,
            cooldown_min: Duration::from_millis(config.cooldown_min_ms),
            cooldown_max: Duration::from_millis(config.cooldown_max_ms),
        }
    }

    /// 在冷却区间内随机取一个时长
    fn random_cooldown(&self) -> Duration {
        let (lo, hi) = if self.cooldown_min <= self.cooldown_max {
            (self.cooldown_min, self.cooldown_max)
        } else {
            (self.cooldown_max, self.cooldown_min)
        };
        if lo == hi {
            return lo;
        }
        let ms = rand::thread_rng().gen_range(lo.as_millis() as u64..=hi.as_millis() as u64);
        Duration::from_millis(ms)
    }
}

/// 执行单元退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Stopped,
    QuotaReached,
}

/// 执行单元退出时的汇总
#[derive(Debug, Clone)]
pub struct UnitSummary {
    pub session: Session,
    pub reason: ExitReason,
}

/// 运行一个执行单元
pub async fn run_unit(
    ctx: UnitCtx,
    flow: InteractionFlow,
    settings: UnitSettings,
    stop: CancellationToken,
) -> AppResult<UnitSummary> {
    let mut session = Session::new(ctx.identity.clone(), ctx.session_id, Utc::now());
    info!(
        "{} 💼 钱包: {} | 每日目标: {} 积分 ({} 次交互) | 下次重置: {}",
        ctx,
        ctx.identity,
        MAX_DAILY_POINTS,
        Session::max_daily_interactions(),
        fmt_time(session.next_reset_time)
    );

    let mut interaction_count: u64 = 0;
    let reason = loop {
        if stop.is_cancelled() {
            break ExitReason::Stopped;
        }

        if session.maybe_reset_daily(Utc::now()) {
            info!("{} ✨ 新的 24 小时奖励周期开始", ctx);
        }

        if let QuotaStatus::WaitUntilReset(wait) = session.quota_status(Utc::now()) {
            if settings.mode == UnitMode::UntilQuota {
                info!("{} 🎯 已达到每日上限 ({} 积分)，执行单元退出", ctx, MAX_DAILY_POINTS);
                break ExitReason::QuotaReached;
            }
            info!(
                "{} ⏳ 已达到每日上限 ({} 积分) | 下次重置: {}",
                ctx,
                MAX_DAILY_POINTS,
                fmt_time(session.next_reset_time)
            );
            if sleep_or_cancel(wait, &stop).await {
                break ExitReason::Stopped;
            }
            continue;
        }

        interaction_count += 1;
        info!(
            "{} 🔄 交互 #{} | 进度: {}/{} 积分 | 下次重置: {}",
            ctx,
            interaction_count,
            session.daily_points + POINTS_PER_INTERACTION,
            MAX_DAILY_POINTS,
            fmt_time(session.next_reset_time)
        );

        flow.run_once(&ctx, &mut session).await;
        log_statistics(&ctx, &session);

        let cooldown = settings.random_cooldown();
        info!("{} ⏳ 冷却: {:.1} 秒...", ctx, cooldown.as_secs_f64());
        if sleep_or_cancel(cooldown, &stop).await {
            break ExitReason::Stopped;
        }
    };

    if reason == ExitReason::Stopped {
        info!("{} 🛑 执行单元已停止", ctx);
    }
    log_statistics(&ctx, &session);

    Ok(UnitSummary { session, reason })
}

fn log_statistics(ctx: &UnitCtx, session: &Session) {
    let stats = &session.statistics;
    info!(
        "{} 💰 总积分: {} | 今日: {} | 成功: {} | 失败: {}",
        ctx,
        stats.total_points,
        session.daily_points,
        stats.successful_interactions,
        stats.failed_interactions
    );
}
