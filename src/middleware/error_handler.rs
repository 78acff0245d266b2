use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

// 日志只记录错误响应体的前 1KB，客户端拿到完整的响应体
const LOGGED_BODY_LIMIT: usize = 1024;

pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;

    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        warn!("Request throttled - {} {}", method, uri);
        return response;
    }

    if !response.status().is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read error response body: {}", e);
            parts.headers.remove(axum::http::header::CONTENT_LENGTH);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let logged = &bytes[..bytes.len().min(LOGGED_BODY_LIMIT)];
    error!(
        "Server error occurred - {} {} - Status: {}, Body: {}{}",
        method,
        uri,
        parts.status,
        String::from_utf8_lossy(logged),
        if bytes.len() > LOGGED_BODY_LIMIT { "..." } else { "" }
    );

    // body 已被消费，重新构建响应
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}
