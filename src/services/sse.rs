//! 事件流（SSE）累加器
//!
//! 把 `data: {json}` 帧中的增量内容按到达顺序拼接，遇到 `data: [DONE]` 结束。
//! 单个帧解析失败只会被跳过，不会丢失已累积的内容。

use serde_json::Value as JsonValue;
use tracing::debug;

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct SseAccumulator {
    pending: Vec<u8>,
    answer: String,
    done: bool,
    skipped_frames: usize,
}

impl SseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一个网络块；行可能跨块，未完成的行留到下一次
    pub fn feed(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            self.push_line(&line);
        }
    }

    /// 处理一行
    pub fn push_line(&mut self, line: &str) {
        if self.done {
            return;
        }
        let line = line.trim_end_matches('\r');
        let Some(payload) = line.strip_prefix("data:") else {
            return;
        };
        let payload = payload.strip_prefix(' ').unwrap_or(payload);

        if payload.trim() == DONE_SENTINEL {
            self.done = true;
            return;
        }

        match serde_json::from_str::<JsonValue>(payload) {
            Ok(frame) => {
                if let Some(delta) = frame
                    .pointer("/choices/0/delta/content")
                    .and_then(|v| v.as_str())
                {
                    self.answer.push_str(delta);
                }
            }
            Err(e) => {
                self.skipped_frames += 1;
                debug!("跳过无法解析的事件帧: {} ({})", payload, e);
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn skipped_frames(&self) -> usize {
        self.skipped_frames
    }

    /// 已累积的内容
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// 结束累积，处理最后一个没有换行符的行
    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&rest).into_owned();
            self.push_line(&line);
        }
        self.answer
    }
}
