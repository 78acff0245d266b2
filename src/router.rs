use std::sync::Arc;

use axum::{Router, routing::post};

use crate::{
    AppState,
    middleware::{RateLimitGuard, log_errors, rate_limit},
    routes,
};

/// 构建应用路由；生成接口单独挂载限流守卫
pub fn build_router(state: AppState) -> Router {
    let guard = Arc::new(RateLimitGuard::new(
        state.rate_limiter.clone(),
        state.config.rate_limit_options(),
    ));

    let generation_routes = Router::new()
        .route("/rooms/{slug}/generate", post(routes::generate::generate))
        .route_layer(axum::middleware::from_fn_with_state(guard, rate_limit));

    Router::new()
        .nest(&state.config.api_base_uri, generation_routes)
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
