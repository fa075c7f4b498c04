//! Unified error handling for the contacts API.
//!
//! Every error leaves the service as JSON `{"detail": "<message>"}`. Storage
//! failures are logged with their raw cause and reported to Sentry; clients
//! only ever see a generic message for them.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Application-level error type for the contacts API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Bearer credential missing, rejected, or unverifiable.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Request path or body failed validation.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Repository(err) if err.is_storage_failure() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::Repository(_) => StatusCode::BAD_REQUEST,
            Self::Auth(err) if err.is_credential_rejection() => StatusCode::UNAUTHORIZED,
            Self::Auth(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Message safe to return to the client.
    fn client_message(&self) -> String {
        match self {
            Self::Repository(RepositoryError::NotFound) => "Contact not found".to_string(),
            Self::Repository(RepositoryError::Conflict(_)) => "Contact already exists".to_string(),
            Self::Repository(_) => "Internal server error".to_string(),
            Self::Auth(AuthError::MissingCredential) => "Not authenticated".to_string(),
            Self::Auth(err) if err.is_credential_rejection() => {
                "Invalid authentication credentials".to_string()
            }
            Self::Auth(_) => "Authentication is temporarily unavailable".to_string(),
            Self::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request failed"
            );
        } else if let Self::Auth(err) = &self {
            tracing::warn!(error = %err, "Rejected bearer credential");
        }

        let body = Json(ErrorBody {
            detail: self.client_message(),
        });

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

/// Set the Sentry user context from a verified subject.
pub fn set_sentry_user(uid: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(uid.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::body::to_bytes;

    use super::*;

    async fn detail_of(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["detail"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::from(RepositoryError::NotFound);
        assert_eq!(err.to_string(), "Repository error: not found");

        let err = AppError::Validation("first_name cannot be empty".to_string());
        assert_eq!(err.to_string(), "Validation error: first_name cannot be empty");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("dup".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::Timeout(Duration::from_secs(5)).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AuthError::Expired.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::NotConfigured.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AuthError::Unavailable("jwks down".to_string()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Validation("bad".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_storage_detail_is_not_exposed() {
        let err = AppError::from(RepositoryError::Database(sqlx::Error::Protocol(
            "relation \"contacts\" does not exist".to_string(),
        )));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail_of(response).await, "Internal server error");
    }

    #[tokio::test]
    async fn test_domain_messages() {
        let response = AppError::from(RepositoryError::NotFound).into_response();
        assert_eq!(detail_of(response).await, "Contact not found");

        let response =
            AppError::from(RepositoryError::Conflict("dup".to_string())).into_response();
        assert_eq!(detail_of(response).await, "Contact already exists");
    }

    #[test]
    fn test_unauthorized_carries_challenge() {
        let response = AppError::from(AuthError::MissingCredential).into_response();
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
