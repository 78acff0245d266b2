use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::models::{RateLimitDecision, RateLimitOptions, RateLimitRecord, ceil_div};

/// 进程内的限流计数存储
///
/// 过期记录不会被主动清理，只会在该身份下一次请求时被覆盖，
/// 因此长时间运行的进程会为每个出现过的身份保留一条记录。
#[derive(Debug, Default)]
pub struct RateLimitStore {
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateLimitRecord>> {
        // 计数器在 panic 后仍然可用
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, identity: &str) -> Option<RateLimitRecord> {
        self.lock().get(identity).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// 固定窗口限流器
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    store: Arc<RateLimitStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<RateLimitStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RateLimitStore> {
        &self.store
    }

    /// 以当前时间判定一次请求
    pub fn check_now(&self, identity: &str, options: &RateLimitOptions) -> RateLimitDecision {
        self.check(identity, options, chrono::Utc::now().timestamp_millis())
    }

    /// 判定一次请求，被拒绝的请求同样计入窗口
    pub fn check(
        &self,
        identity: &str,
        options: &RateLimitOptions,
        now_ms: i64,
    ) -> RateLimitDecision {
        let window_ms = i64::try_from(options.window_ms).unwrap_or(i64::MAX);
        let mut records = self.store.lock();

        match records.get_mut(identity) {
            Some(record) if now_ms < record.reset_at => {
                record.count += 1;
                let count = record.count;
                let retry_after_ms = (record.reset_at - now_ms).max(0);

                let allowed = count <= u64::from(options.max);
                if !allowed {
                    tracing::debug!(identity, count, max = options.max, "rate limit exceeded");
                }
                RateLimitDecision {
                    allowed,
                    remaining: u64::from(options.max).saturating_sub(count) as u32,
                    reset_at: record.reset_at,
                    retry_after_secs: ceil_div(retry_after_ms, 1000) as u64,
                }
            }
            _ => {
                let reset_at = now_ms.saturating_add(window_ms);
                records.insert(identity.to_string(), RateLimitRecord { count: 1, reset_at });
                RateLimitDecision {
                    allowed: true,
                    remaining: options.max.saturating_sub(1),
                    reset_at,
                    retry_after_secs: ceil_div(window_ms, 1000) as u64,
                }
            }
        }
    }
}
