//! Current-caller endpoint.

use axum::Json;

use crate::middleware::RequireAuth;
use crate::services::auth::AuthenticatedSubject;

/// `GET /me` - the verified subject behind the bearer credential.
pub async fn me(RequireAuth(subject): RequireAuth) -> Json<AuthenticatedSubject> {
    Json(subject)
}
