use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    error::AppError,
    generation::{CompletionRequest, TextGenerator},
};

#[axum::debug_handler]
pub async fn generate(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let generator = TextGenerator::from_config(&state.config, state.http.clone())?;

    let req: CompletionRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
    req.validate()?;

    tracing::info!("Generating text for room {} with model {}", slug, generator.model());
    let stream = generator.stream_text(&req).await?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response())
}
