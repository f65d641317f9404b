//! 题库
//!
//! 内置题库在编译期生成（phf），可以通过 TOML 文件覆盖或追加：
//!
//! ```toml
//! "Kite AI Assistant" = ["What is Kite AI?", "How do agents earn rewards?"]
//! ```

use crate::error::ConfigError;
use phf::phf_map;
use std::collections::HashMap;
use std::path::Path;

static BUILTIN_QUESTIONS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "Kite AI Assistant" => &[
        "What is Kite AI and what problem does it solve?",
        "How does Kite AI attribute value to AI agents?",
        "What is Proof of Attributed Intelligence?",
        "How can developers build agents on Kite AI?",
        "What are the main components of the Kite AI ecosystem?",
        "How does Kite AI handle data ownership?",
        "What role do validators play in Kite AI?",
        "How are rewards distributed to contributors on Kite AI?",
        "What is the difference between a model and an agent on Kite AI?",
        "How does Kite AI ensure agent interactions are verifiable?",
    ],
    "Crypto Price Assistant" => &[
        "What is the current price of Bitcoin?",
        "What is the current price of Ethereum?",
        "How has Solana performed over the last 24 hours?",
        "What is the market cap of BNB?",
        "Which token had the highest trading volume today?",
        "What is the current price of AVAX?",
        "How volatile has ETH been this week?",
        "What is the price trend of DOGE today?",
        "Compare the price change of BTC and ETH today.",
        "What is the current price of LINK?",
    ],
    "Transaction Analyzer" => &[
        "What are the most common types of blockchain transactions?",
        "How do I read the gas fields of a transaction?",
        "What does a failed transaction status mean?",
        "How can I tell if a transaction is a contract call?",
        "What is a transaction nonce used for?",
    ],
};

/// 题库：Agent 名称 -> 候选问题
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: HashMap<String, Vec<String>>,
}

impl QuestionBank {
    /// 内置题库
    pub fn builtin() -> Self {
        let questions = BUILTIN_QUESTIONS
            .entries()
            .map(|(name, qs)| (name.to_string(), qs.iter().map(|q| q.to_string()).collect()))
            .collect();
        Self { questions }
    }

    /// 内置题库 + 可选的 TOML 覆盖文件
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut bank = Self::builtin();
        if let Some(path) = path {
            let content = std::fs::read_to_string(Path::new(path)).map_err(|source| {
                ConfigError::SourceUnreadable {
                    path: path.to_string(),
                    source,
                }
            })?;
            bank.merge_toml(&content, path)?;
        }
        Ok(bank)
    }

    /// 合并 TOML 内容，同名 Agent 的问题列表被整体替换
    pub fn merge_toml(&mut self, content: &str, origin: &str) -> Result<(), ConfigError> {
        let overrides: HashMap<String, Vec<String>> =
            toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
                path: origin.to_string(),
                source,
            })?;
        for (name, qs) in overrides {
            let qs: Vec<String> = qs.into_iter().filter(|q| !q.trim().is_empty()).collect();
            self.questions.insert(name, qs);
        }
        Ok(())
    }

    /// 获取某个 Agent 的候选问题；没有专属问题时使用全部问题
    pub fn for_agent(&self, name: &str) -> Vec<String> {
        match self.questions.get(name) {
            Some(qs) if !qs.is_empty() => qs.clone(),
            _ => {
                let mut all: Vec<String> = self.questions.values().flatten().cloned().collect();
                all.sort();
                all
            }
        }
    }
}
