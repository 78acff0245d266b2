use serde::{Deserialize, Serialize};

/// 限流参数，由受保护的接口各自提供
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitOptions {
    pub window_ms: u64,
    pub max: u32,
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            max: 10,
        }
    }
}

/// 单个客户端的窗口计数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub count: u64,
    pub reset_at: i64, // Unix timestamp (ms)
}

/// 限流判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: i64, // Unix timestamp (ms)
    pub retry_after_secs: u64,
}

impl RateLimitDecision {
    /// `x-ratelimit-reset` 使用的秒级时间戳，向上取整
    pub fn reset_at_secs(&self) -> i64 {
        ceil_div(self.reset_at, 1000)
    }
}

pub(crate) fn ceil_div(value: i64, divisor: i64) -> i64 {
    let quotient = value.div_euclid(divisor);
    if value.rem_euclid(divisor) == 0 {
        quotient
    } else {
        quotient + 1
    }
}
