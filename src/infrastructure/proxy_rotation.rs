//! 代理轮换
//!
//! `ProxyRotation` 持有代理池和游标；`RotatingTransport` 持有执行单元当前使用的
//! 传输层，失败时切换到下一个代理并重建客户端。

use crate::infrastructure::transport::{HttpTransport, TransportSettings};
use crate::error::ConfigError;
use crate::models::ProxyDescriptor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// 代理池（轮询）
///
/// 游标为原子变量，同一次运行中的所有执行单元可以共享一个实例。
#[derive(Debug)]
pub struct ProxyRotation {
    pool: Vec<ProxyDescriptor>,
    enabled: bool,
    cursor: AtomicUsize,
}

impl ProxyRotation {
    pub fn new(pool: Vec<ProxyDescriptor>, enabled: bool) -> Self {
        Self {
            pool,
            enabled,
            cursor: AtomicUsize::new(0),
        }
    }

    /// 不使用代理（直连）
    pub fn disabled() -> Self {
        Self::new(Vec::new(), false)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.pool.is_empty()
    }

    /// 按轮询顺序返回下一个代理；池为空或未启用时返回 None
    pub fn next(&self) -> Option<ProxyDescriptor> {
        if !self.is_active() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        Some(self.pool[idx].clone())
    }

    /// 代理失败：游标前进一位并返回接替的代理
    ///
    /// 游标被其他执行单元推进后可能正好落回失败的代理，此时再前进一位。
    pub fn on_failure(&self, failing: Option<&ProxyDescriptor>) -> Option<ProxyDescriptor> {
        let next = self.next()?;
        if failing == Some(&next) && self.pool.len() > 1 {
            return self.next();
        }
        Some(next)
    }
}

/// 可轮换代理的传输层，由单个执行单元持有
pub struct RotatingTransport {
    rotation: Arc<ProxyRotation>,
    settings: TransportSettings,
    current: Mutex<Arc<HttpTransport>>,
}

impl RotatingTransport {
    /// 从代理池取一个代理并构建初始传输层
    pub fn new(rotation: Arc<ProxyRotation>, settings: TransportSettings) -> Result<Self, ConfigError> {
        let proxy = rotation.next();
        let transport = HttpTransport::build(proxy.as_ref(), &settings)?;
        Ok(Self {
            rotation,
            settings,
            current: Mutex::new(Arc::new(transport)),
        })
    }

    /// 当前传输层（克隆 Arc，锁不会跨 await 持有）
    pub fn current(&self) -> Arc<HttpTransport> {
        match self.current.lock() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// 当前代理（用于日志）
    pub fn current_proxy(&self) -> Option<ProxyDescriptor> {
        self.current().proxy().cloned()
    }

    /// 网络失败后切换代理并重建传输层
    pub fn rotate(&self) {
        if !self.rotation.is_active() {
            return;
        }
        let failing = self.current_proxy();
        let next = self.rotation.on_failure(failing.as_ref());

        match HttpTransport::build(next.as_ref(), &self.settings) {
            Ok(transport) => {
                if let Some(p) = &next {
                    info!("🔄 切换代理: {}", p);
                }
                let mut guard = match self.current.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *guard = Arc::new(transport);
            }
            Err(e) => error!("❌ 切换代理失败，继续使用当前代理: {}", e),
        }
    }
}
