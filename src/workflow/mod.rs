pub mod interaction_flow;
pub mod session;
pub mod unit_ctx;

pub use interaction_flow::{InteractionFlow, InteractionResult};
pub use session::{QuotaStatus, Session, SessionStatistics, MAX_DAILY_POINTS, POINTS_PER_INTERACTION};
pub use unit_ctx::UnitCtx;
