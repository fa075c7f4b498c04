//! Status and health check handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

/// Body of the status endpoints.
#[derive(Debug, Serialize)]
pub struct StatusPayload {
    pub status: &'static str,
    pub message: &'static str,
}

/// `GET /`
pub async fn root() -> Json<StatusPayload> {
    Json(StatusPayload {
        status: "OK",
        message: "Contact API is running",
    })
}

/// Liveness check. Does not touch the store.
pub async fn health() -> Json<StatusPayload> {
    Json(StatusPayload {
        status: "healthy",
        message: "API is operational",
    })
}

/// Readiness check.
///
/// Returns 503 Service Unavailable if the store is not reachable.
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<StatusPayload>) {
    match state.contacts().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(StatusPayload {
                status: "ready",
                message: "Database is reachable",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(StatusPayload {
                    status: "unavailable",
                    message: "Database is unreachable",
                }),
            )
        }
    }
}
