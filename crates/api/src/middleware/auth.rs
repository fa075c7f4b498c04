//! Auth Gate middleware and extractor.
//!
//! Both read `Authorization: Bearer <token>`, verify it with the configured
//! [`TokenVerifier`](crate::services::auth::TokenVerifier), and make the
//! [`AuthenticatedSubject`] available to handlers.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::{AuthError, AuthenticatedSubject};
use crate::state::AppState;

/// Extract the bearer token from request headers.
///
/// # Errors
///
/// Returns `MissingCredential` without an `Authorization` header, and
/// `MalformedCredential` when the header is not `Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredential)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::MalformedCredential)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedCredential);
    }

    Ok(token)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthenticatedSubject, AuthError> {
    let token = bearer_token(headers)?;
    let verifier = state.verifier().ok_or(AuthError::NotConfigured)?;
    let subject = verifier.verify(token).await?;

    set_sentry_user(&subject.uid, subject.email.as_deref());
    tracing::debug!(uid = %subject.uid, "Authenticated request");

    Ok(subject)
}

/// Middleware that rejects requests without a valid bearer credential.
///
/// On success the [`AuthenticatedSubject`] is stored in request extensions.
///
/// # Errors
///
/// Returns `AppError::Auth` when the credential is missing, rejected, or
/// cannot be verified.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let subject = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(subject);
    Ok(next.run(request).await)
}

/// Extractor that requires a verified caller.
///
/// Reuses the subject stored by [`require_auth`] when that middleware ran,
/// otherwise verifies the request's credential itself.
///
/// # Example
///
/// ```rust,ignore
/// async fn whoami(RequireAuth(subject): RequireAuth) -> String {
///     subject.uid
/// }
/// ```
pub struct RequireAuth(pub AuthenticatedSubject);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(subject) = parts.extensions.get::<AuthenticatedSubject>() {
            return Ok(Self(subject.clone()));
        }

        let subject = authenticate(state, &parts.headers).await?;
        Ok(Self(subject))
    }
}
