use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::utils::error_codes;

#[derive(Debug)]
pub enum AppError {
    MissingApiKey,
    InvalidRequest(String),
    UpstreamFailed(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    error_message: String,
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, i32, String) {
        match self {
            AppError::MissingApiKey => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "Missing OPENAI_API_KEY environment variable.".to_string(),
            ),
            AppError::InvalidRequest(reason) => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                format!("请求参数无效: {}", reason),
            ),
            AppError::UpstreamFailed(reason) => (
                StatusCode::BAD_GATEWAY,
                error_codes::UPSTREAM_ERROR,
                format!("文本生成服务调用失败: {}", reason),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = self.status_and_message();

        let body = Json(ErrorResponse {
            code,
            error_message,
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::UpstreamFailed(e.to_string())
    }
}
