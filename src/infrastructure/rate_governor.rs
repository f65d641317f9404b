//! 请求频率控制
//!
//! - `await_slot`：保证两次出站请求之间至少间隔 `60000 / requests_per_minute` 毫秒
//! - `compute_backoff`：`min(max_delay, base_delay * 2^attempt)`

use crate::config::RateLimitConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// 频率控制器，每个执行单元持有一个
pub struct RateGovernor {
    min_interval: Duration,
    base_delay_ms: u64,
    max_delay_ms: u64,
    max_retries: u32,
    last_grant: Mutex<Option<Instant>>,
}

impl RateGovernor {
    pub fn new(config: &RateLimitConfig) -> Self {
        let min_interval = if config.requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(60_000 / u64::from(config.requests_per_minute))
        };

        Self {
            min_interval,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            max_retries: config.max_retries,
            last_grant: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// 等待下一个请求槽位
    ///
    /// 锁在等待期间保持，同一控制器的并发调用按顺序获得槽位。
    pub async fn await_slot(&self) {
        let mut last = self.last_grant.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("频率控制: 等待 {} 毫秒", wait.as_millis());
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// 第 `attempt` 次重试前的退避时间
    pub fn compute_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(compute_backoff_ms(self.base_delay_ms, self.max_delay_ms, attempt))
    }
}

/// 指数退避（毫秒），对任意 attempt 不会溢出
pub fn compute_backoff_ms(base_delay_ms: u64, max_delay_ms: u64, attempt: u32) -> u64 {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    base_delay_ms.saturating_mul(factor).min(max_delay_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn governor(rpm: u32) -> RateGovernor {
        RateGovernor::new(&RateLimitConfig {
            max_retries: 5,
            base_delay_ms: 2000,
            max_delay_ms: 10000,
            requests_per_minute: rpm,
        })
    }

    #[test]
    fn test_backoff_sequence() {
        let g = governor(15);
        let delays: Vec<u64> = (0..=5).map(|a| g.compute_backoff(a).as_millis() as u64).collect();
        assert_eq!(delays, vec![2000, 4000, 8000, 10000, 10000, 10000]);
    }

    #[test]
    fn test_backoff_monotonic_and_bounded() {
        let mut prev = 0;
        for attempt in 0..200 {
            let d = compute_backoff_ms(2000, 10000, attempt);
            assert!(d >= prev);
            assert!(d <= 10000);
            prev = d;
        }
        assert_eq!(compute_backoff_ms(3, u64::MAX, 100), u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_slot_spaces_requests() {
        let g = governor(15);
        assert_eq!(g.min_interval(), Duration::from_secs(4));

        let start = Instant::now();
        g.await_slot().await;
        assert!(start.elapsed() < Duration::from_millis(1));

        g.await_slot().await;
        assert!(start.elapsed() >= Duration::from_secs(4));

        g.await_slot().await;
        assert!(start.elapsed() >= Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rpm_disables_gate() {
        let g = governor(0);
        let start = Instant::now();
        g.await_slot().await;
        g.await_slot().await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }
}
