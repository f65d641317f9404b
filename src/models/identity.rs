use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// 钱包身份（地址字符串），整个运行期间不可变
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 日志前缀用的短地址，例如 `0xabcd..`
    pub fn short(&self) -> String {
        let prefix: String = self.0.chars().take(6).collect();
        format!("{}..", prefix)
    }

    /// 是否符合标准 EVM 地址格式
    pub fn is_evm_address(&self) -> bool {
        static EVM_ADDRESS: OnceLock<Option<Regex>> = OnceLock::new();
        EVM_ADDRESS
            .get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").ok())
            .as_ref()
            .is_some_and(|re| re.is_match(&self.0))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
