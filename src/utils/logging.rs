use chrono::{DateTime, Utc};
/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::fs;
use tracing::info;

use crate::error::FileError;

/// 初始化运行日志文件（写入文件头）
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<(), FileError> {
    let log_header = format!(
        "{}\n运行日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|source| FileError::WriteFailed {
        path: log_file_path.to_string(),
        source,
    })
}

/// 记录程序启动信息
///
/// # 参数
/// - `max_concurrency`: 最大并发数
pub fn log_startup(max_concurrency: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 多钱包并发模式");
    info!("📊 最大并发数: {}", max_concurrency);
    info!("{}", "=".repeat(60));
}

/// 记录加载信息
pub fn log_loaded(wallets: usize, proxies: usize, agents: usize) {
    info!("📊 已加载: {} 个钱包, {} 个代理, {} 个 Agent", wallets, proxies, agents);
    if proxies == 0 {
        info!("🌐 未配置代理，使用直连");
    }
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 起始钱包编号
/// - `end`: 结束钱包编号
/// - `total`: 钱包总数
pub fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("{}", "=".repeat(60));
    info!("📦 开始第 {}/{} 批", batch_num, total_batches);
    info!("👛 本批钱包: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, completed: usize, total: usize) {
    info!("{}", "─".repeat(60));
    info!("✓ 第 {} 批结束: 正常退出 {}/{}", batch_num, completed, total);
    info!("{}", "─".repeat(60));
}

/// 记录一轮结束信息
pub fn log_cycle_complete(cycle: usize, completed: usize, errors: &[String], cooldown_minutes: u64) {
    info!("{}", "=".repeat(60));
    info!("🏁 第 {} 轮完成: 正常退出 {} 个执行单元", cycle, completed);
    for e in errors {
        info!("❌ {}", e);
    }
    info!(
        "[{}] 所有钱包已处理，等待 {} 分钟...",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        cooldown_minutes
    );
    info!("{}", "=".repeat(60));
}

/// 日志用时间格式
pub fn fmt_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
