/*
 * Responsibility
 * - GET /health, /api/health (疎通用)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "message": "Leave Application System API is running",
        })),
    )
}
