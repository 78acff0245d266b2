// 限流模块
// 固定窗口计数器，按客户端身份分桶

pub mod identity;
pub mod models;
pub mod operations;

pub use identity::{UNKNOWN_CLIENT, client_id};
pub use models::{RateLimitDecision, RateLimitOptions, RateLimitRecord};
pub use operations::{RateLimitStore, RateLimiter};
