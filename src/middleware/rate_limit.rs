use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    rate_limit::{RateLimitDecision, RateLimitOptions, RateLimiter, client_id},
    utils::{error_codes, error_to_api_response},
};

/// 单个受保护接口的限流守卫
#[derive(Debug, Clone)]
pub struct RateLimitGuard {
    limiter: RateLimiter,
    options: RateLimitOptions,
}

impl RateLimitGuard {
    pub fn new(limiter: RateLimiter, options: RateLimitOptions) -> Self {
        Self { limiter, options }
    }

    pub async fn check_rate_limit(self: Arc<Self>, req: Request<Body>, next: Next) -> Response {
        let identity = client_id(req.headers());
        let decision = self.limiter.check_now(&identity, &self.options);

        if !decision.allowed {
            tracing::warn!(
                identity = %identity,
                retry_after = decision.retry_after_secs,
                "Rate limit exceeded"
            );
            let response = (
                StatusCode::TOO_MANY_REQUESTS,
                error_to_api_response::<()>(
                    error_codes::RATE_LIMIT,
                    format!("请求过于频繁，请在{}秒后重试", decision.retry_after_secs),
                ),
            )
                .into_response();
            return with_rate_limit_headers(response, &decision, self.options.max);
        }

        let response = next.run(req).await;
        with_rate_limit_headers(response, &decision, self.options.max)
    }
}

pub async fn rate_limit(
    State(guard): State<Arc<RateLimitGuard>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    guard.check_rate_limit(req, next).await
}

/// 写入限流响应头；仅在拒绝时附带 `retry-after`
pub fn with_rate_limit_headers(
    mut response: Response,
    decision: &RateLimitDecision,
    limit: u32,
) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(decision.remaining),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderValue::from(decision.reset_at_secs()),
    );
    if !decision.allowed {
        headers.insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(decision.retry_after_secs),
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(allowed: bool) -> RateLimitDecision {
        RateLimitDecision {
            allowed,
            remaining: if allowed { 4 } else { 0 },
            reset_at: 1_700_000_000_500,
            retry_after_secs: 42,
        }
    }

    #[test]
    fn allowed_response_has_no_retry_after() {
        let response = with_rate_limit_headers(StatusCode::OK.into_response(), &decision(true), 5);
        let headers = response.headers();
        assert_eq!(headers["x-ratelimit-limit"], "5");
        assert_eq!(headers["x-ratelimit-remaining"], "4");
        assert_eq!(headers["x-ratelimit-reset"], "1700000001");
        assert!(headers.get("retry-after").is_none());
    }

    #[test]
    fn rejected_response_carries_retry_after() {
        let response = with_rate_limit_headers(
            StatusCode::TOO_MANY_REQUESTS.into_response(),
            &decision(false),
            5,
        );
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(response.headers()["retry-after"], "42");
    }
}
