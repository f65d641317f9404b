//! 基础设施层（Infrastructure Layer）
//!
//! 持有出站网络资源，只暴露能力：
//! - `transport` - HTTP 客户端（直连或经代理）
//! - `rate_governor` - 请求间隔与指数退避
//! - `proxy_rotation` - 代理池轮换与传输层重建

pub mod proxy_rotation;
pub mod rate_governor;
pub mod transport;

pub use proxy_rotation::{ProxyRotation, RotatingTransport};
pub use rate_governor::{compute_backoff_ms, RateGovernor};
pub use transport::{HttpResponse, HttpTransport, ResponseBody, TransportSettings};
