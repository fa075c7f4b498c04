//! Authentication service.
//!
//! The Auth Gate verifies an opaque bearer credential with an external
//! identity authority and yields the caller's subject identifier. The
//! verifier is built once at start-up and injected through application
//! state; a broken configuration aborts start-up instead of degrading.

mod error;
mod firebase;

pub use error::AuthError;
pub use firebase::{FirebaseTokenVerifier, ServiceAccount};
#[cfg(test)]
pub(crate) use firebase::tests as test_tokens;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::AuthConfig;

/// The verified caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedSubject {
    /// Subject identifier issued by the identity provider.
    pub uid: String,
    /// Email claim, when the provider includes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Verifies bearer credentials.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` and return the subject it was issued to.
    ///
    /// # Errors
    ///
    /// Returns a credential rejection (`InvalidToken`, `Expired`) when the
    /// token is bad, or `Unavailable` when the authority cannot be consulted.
    async fn verify(&self, token: &str) -> Result<AuthenticatedSubject, AuthError>;
}

/// Build the Auth Gate client from configuration.
///
/// Returns `Ok(None)` when no service account is configured and routes are
/// not required to authenticate.
///
/// # Errors
///
/// Returns `AuthError::ServiceAccount` if a configured bundle cannot be
/// loaded, or if authentication is required without a bundle.
pub fn init_verifier(config: &AuthConfig) -> Result<Option<Arc<dyn TokenVerifier>>, AuthError> {
    let Some(path) = config.service_account_path.as_deref() else {
        if config.require_auth {
            return Err(AuthError::ServiceAccount(
                "CONTACTS_REQUIRE_AUTH is set but CONTACTS_AUTH_SERVICE_ACCOUNT is not".to_owned(),
            ));
        }
        tracing::warn!("No service account configured; bearer-token verification is disabled");
        return Ok(None);
    };

    let account = ServiceAccount::from_file(path)?;
    let verifier =
        FirebaseTokenVerifier::new(&account.project_id, &config.jwks_url, config.key_cache_ttl)?;

    tracing::info!(
        project_id = %account.project_id,
        require_auth = config.require_auth,
        "Token verifier initialized"
    );

    Ok(Some(Arc::new(verifier)))
}
