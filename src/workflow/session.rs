//! 钱包会话状态
//!
//! 每个执行单元持有一个，只被该单元修改。所有与时间相关的操作都显式接收 `now`。

use crate::models::Identity;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// 每日积分上限
pub const MAX_DAILY_POINTS: u32 = 200;
/// 每次成功交互获得的积分
pub const POINTS_PER_INTERACTION: u32 = 10;

fn reset_period() -> ChronoDuration {
    ChronoDuration::hours(24)
}

/// 交互统计
#[derive(Debug, Clone, Default)]
pub struct SessionStatistics {
    pub per_agent_interactions: HashMap<String, u32>,
    pub total_interactions: u32,
    pub successful_interactions: u32,
    pub failed_interactions: u32,
    pub total_points: u32,
    pub last_interaction_time: Option<DateTime<Utc>>,
}

/// 额度检查结果。达到上限不是错误，而是"等到重置"的调度信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaStatus {
    Available,
    WaitUntilReset(Duration),
}

/// 钱包会话
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    /// 从 1 开始的会话编号（日志用）
    pub session_id: usize,
    pub daily_points: u32,
    pub start_time: DateTime<Utc>,
    pub next_reset_time: DateTime<Utc>,
    pub statistics: SessionStatistics,
}

impl Session {
    pub fn new(identity: Identity, session_id: usize, now: DateTime<Utc>) -> Self {
        Self {
            identity,
            session_id,
            daily_points: 0,
            start_time: now,
            next_reset_time: now + reset_period(),
            statistics: SessionStatistics::default(),
        }
    }

    /// 每日最多成功交互次数
    pub fn max_daily_interactions() -> u32 {
        MAX_DAILY_POINTS / POINTS_PER_INTERACTION
    }

    /// 记录一次交互
    pub fn record_interaction(&mut self, agent_name: &str, success: bool, now: DateTime<Utc>) {
        *self
            .statistics
            .per_agent_interactions
            .entry(agent_name.to_string())
            .or_insert(0) += 1;
        self.statistics.total_interactions += 1;
        self.statistics.last_interaction_time = Some(now);

        if success {
            self.daily_points += POINTS_PER_INTERACTION;
            self.statistics.total_points += POINTS_PER_INTERACTION;
            self.statistics.successful_interactions += 1;
        } else {
            self.statistics.failed_interactions += 1;
        }
    }

    /// 到达重置时间则清零每日积分，返回是否发生了重置
    pub fn maybe_reset_daily(&mut self, now: DateTime<Utc>) -> bool {
        if now >= self.next_reset_time {
            self.daily_points = 0;
            self.next_reset_time = now + reset_period();
            true
        } else {
            false
        }
    }

    pub fn quota_reached(&self) -> bool {
        self.daily_points >= MAX_DAILY_POINTS
    }

    /// 距离下次重置的时间，已过重置时间则为零
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Duration {
        (self.next_reset_time - now).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn quota_status(&self, now: DateTime<Utc>) -> QuotaStatus {
        if self.quota_reached() {
            QuotaStatus::WaitUntilReset(self.time_until_reset(now))
        } else {
            QuotaStatus::Available
        }
    }
}
