//! 链上交易源 - 业务能力层
//!
//! 只负责"获取最近已确认交易哈希"能力

use crate::infrastructure::{RateGovernor, RotatingTransport};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

pub struct TxFeed {
    url: String,
}

impl TxFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// 获取最近交易哈希；失败时轮换代理并返回空列表
    pub async fn recent_hashes(
        &self,
        transport: &RotatingTransport,
        governor: &RateGovernor,
    ) -> Vec<String> {
        info!("🔍 正在扫描最近的交易...");
        governor.await_slot().await;

        let url = format!("{}?filter=validated", self.url);
        match transport.current().get(&url, &[]).await {
            Ok(response) => {
                let hashes = response.body.json().map(extract_hashes).unwrap_or_default();
                info!("📊 找到 {} 笔最近交易", hashes.len());
                hashes
            }
            Err(e) => {
                warn!("❌ 获取交易失败: {}", e);
                transport.rotate();
                Vec::new()
            }
        }
    }
}

/// 从 `{ items: [ { hash, ... } ] }` 中提取哈希
pub fn extract_hashes(body: &JsonValue) -> Vec<String> {
    body.get("items")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("hash").and_then(|h| h.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_hashes() {
        let body = json!({ "items": [ { "hash": "0x1" }, { "nohash": true }, { "hash": "0x2" } ] });
        assert_eq!(extract_hashes(&body), vec!["0x1".to_string(), "0x2".to_string()]);
        assert!(extract_hashes(&json!({})).is_empty());
    }
}
