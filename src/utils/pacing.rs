use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// 可被停止信号打断的等待
///
/// # 返回
/// 等待期间收到停止信号时返回 `true`
pub async fn sleep_or_cancel(duration: Duration, stop: &CancellationToken) -> bool {
    if stop.is_cancelled() {
        return true;
    }
    tokio::select! {
        _ = stop.cancelled() => true,
        _ = sleep(duration) => false,
    }
}
