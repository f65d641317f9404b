//! 执行单元上下文
//!
//! 封装"我正在处理第几个钱包"这一信息

use crate::models::Identity;
use std::fmt::Display;

/// 执行单元上下文
#[derive(Debug, Clone)]
pub struct UnitCtx {
    /// 钱包
    pub identity: Identity,

    /// 会话编号（从1开始，仅用于日志显示）
    pub session_id: usize,
}

impl UnitCtx {
    pub fn new(identity: Identity, session_id: usize) -> Self {
        Self {
            identity,
            session_id,
        }
    }
}

impl Display for UnitCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[会话 {}] [{}]", self.session_id, self.identity.short())
    }
}
