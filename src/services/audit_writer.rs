//! 交互记录写入服务 - 业务能力层
//!
//! 只负责"追加一行成功交互记录"能力，不关心流程

use crate::error::FileError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// 追加写入的交互记录
///
/// 职责：
/// - 每次成功交互追加一行
/// - 只追加，不修改已有内容
pub struct AuditWriter {
    path: PathBuf,
}

impl AuditWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 追加一条记录
    pub async fn append(
        &self,
        at: DateTime<Utc>,
        wallet: &str,
        agent_name: &str,
        question: &str,
    ) -> Result<(), FileError> {
        let line = format_line(at, wallet, agent_name, question);
        debug!("写入交互记录: {}", line.trim_end());

        let write_failed = |source| FileError::WriteFailed {
            path: self.path.display().to_string(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(write_failed)?;
        file.write_all(line.as_bytes()).await.map_err(write_failed)?;
        // tokio 的文件写入在后台完成，返回前必须 flush
        file.flush().await.map_err(write_failed)?;
        Ok(())
    }
}

fn format_line(at: DateTime<Utc>, wallet: &str, agent_name: &str, question: &str) -> String {
    let question = question.replace(['\n', '\r'], " ");
    format!(
        "{} | {} | {} | {}\n",
        at.format("%Y-%m-%d %H:%M:%S"),
        wallet,
        agent_name,
        question
    )
}
