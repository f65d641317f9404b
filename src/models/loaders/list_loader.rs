use crate::error::ConfigError;
use crate::models::{Identity, ProxyDescriptor};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

/// 按行拆分列表文件，忽略空行和 `#` 注释行
pub fn parse_list(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

/// 从文件加载钱包列表
///
/// 文件不存在或没有任何钱包都视为致命的配置错误。
pub async fn load_identities(path: &Path) -> Result<Vec<Identity>, ConfigError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::SourceUnreadable {
            path: path.display().to_string(),
            source,
        })?;

    let identities = parse_identities(&content);
    if identities.is_empty() {
        return Err(ConfigError::NoIdentities {
            path: path.display().to_string(),
        });
    }

    for id in identities.iter().filter(|id| !id.is_evm_address()) {
        warn!("⚠️ 钱包地址格式不标准: {}", id);
    }

    info!("✓ 成功加载 {} 个钱包", identities.len());
    Ok(identities)
}

pub fn parse_identities(content: &str) -> Vec<Identity> {
    parse_list(content).into_iter().map(Identity::new).collect()
}

/// 从文件加载代理列表
///
/// 文件不存在或为空时返回空列表（直连）；任何一行格式错误都会立即失败。
pub async fn load_proxies(path: &Path) -> Result<Vec<ProxyDescriptor>, ConfigError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("ℹ️ 未找到 {}，使用直连", path.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ConfigError::SourceUnreadable {
                path: path.display().to_string(),
                source,
            })
        }
    };

    let proxies = parse_proxies(&content)?;
    if proxies.is_empty() {
        info!("ℹ️ {} 为空，使用直连", path.display());
    } else {
        info!("✓ 成功加载 {} 个代理", proxies.len());
    }
    Ok(proxies)
}

pub fn parse_proxies(content: &str) -> Result<Vec<ProxyDescriptor>, ConfigError> {
    parse_list(content).into_iter().map(str::parse).collect()
}
