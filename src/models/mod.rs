pub mod agent;
pub mod identity;
pub mod loaders;
pub mod proxy;
pub mod question_bank;

pub use agent::{parse_discovery_document, AgentDescriptor, AgentKind, DiscoveredAgents};
pub use identity::Identity;
pub use loaders::{load_identities, load_proxies};
pub use proxy::{ProxyCredentials, ProxyDescriptor, ProxyProtocol};
pub use question_bank::QuestionBank;
