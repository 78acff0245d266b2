use axum::http::HeaderMap;

/// 无法识别的客户端共享的桶
pub const UNKNOWN_CLIENT: &str = "unknown";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// 从请求头推导客户端身份
///
/// 优先级: `x-forwarded-for` 的第一项 > `x-real-ip` > `user-agent` > `"unknown"`
pub fn client_id(headers: &HeaderMap) -> String {
    if let Some(forwarded_for) = header(headers, "x-forwarded-for") {
        let first = forwarded_for.split(',').next().unwrap_or_default().trim();
        return if first.is_empty() {
            forwarded_for.to_string()
        } else {
            first.to_string()
        };
    }

    header(headers, "x-real-ip")
        .or_else(|| header(headers, "user-agent"))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
