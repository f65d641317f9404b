pub mod agent_query;
pub mod audit_writer;
pub mod discovery;
pub mod sse;
pub mod tx_feed;
pub mod usage_reporter;

pub use agent_query::{AgentQueryClient, QueryOutcome, ResponseMode};
pub use audit_writer::AuditWriter;
pub use discovery::AgentDiscovery;
pub use sse::SseAccumulator;
pub use tx_feed::TxFeed;
pub use usage_reporter::UsageReporter;
