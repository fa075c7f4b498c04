//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while verifying a bearer credential.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header on the request.
    #[error("missing bearer credential")]
    MissingCredential,

    /// `Authorization` header present but not `Bearer <token>`.
    #[error("malformed authorization header")]
    MalformedCredential,

    /// Token failed signature, audience, issuer or claim checks.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token was valid once but has expired.
    #[error("token expired")]
    Expired,

    /// No verifier was configured at start-up.
    #[error("token verification is not configured")]
    NotConfigured,

    /// The identity provider could not be reached or returned unusable keys.
    #[error("token verifier unavailable: {0}")]
    Unavailable(String),

    /// The service-account bundle is missing or invalid.
    #[error("invalid service account: {0}")]
    ServiceAccount(String),
}

impl AuthError {
    /// Whether the credential itself was rejected (as opposed to the
    /// verifier being unusable).
    #[must_use]
    pub const fn is_credential_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential | Self::MalformedCredential | Self::InvalidToken(_) | Self::Expired
        )
    }
}
