//! Firebase ID token verification.
//!
//! Tokens are RS256 JWTs signed with Google's rotating secure-token keys.
//! A token is accepted when its signature matches a published key, `aud` is
//! the project id, `iss` is `https://securetoken.google.com/<project id>`,
//! it has not expired, and `sub` is non-empty.
//!
//! The published key set is cached. A token naming an unknown key triggers a
//! refetch, at most once per [`MIN_KEY_REFRESH_INTERVAL`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use moka::future::Cache;
use serde::Deserialize;

use super::{AuthError, AuthenticatedSubject, TokenVerifier};

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum time between two fetches of the key set.
pub const MIN_KEY_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// The fields of a service-account bundle the verifier needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    #[serde(rename = "type")]
    pub account_type: String,
    pub project_id: String,
}

impl ServiceAccount {
    /// Parse a bundle from JSON.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ServiceAccount` if the JSON is invalid, is not a
    /// service account, or has no project id.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let account: Self = serde_json::from_str(json)
            .map_err(|e| AuthError::ServiceAccount(format!("unreadable bundle: {e}")))?;

        if account.account_type != "service_account" {
            return Err(AuthError::ServiceAccount(format!(
                "expected type 'service_account', got '{}'",
                account.account_type
            )));
        }
        if account.project_id.trim().is_empty() {
            return Err(AuthError::ServiceAccount("project_id is empty".to_owned()));
        }

        Ok(account)
    }

    /// Load a bundle from disk.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ServiceAccount` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AuthError::ServiceAccount(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

/// Claims read from a verified token.
#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

enum KeySource {
    Remote {
        client: reqwest::Client,
        url: String,
        cache: Cache<(), Arc<JwkSet>>,
        /// Holds an entry while a fetch is too recent to repeat.
        recently_fetched: Cache<(), ()>,
    },
    Static(Arc<JwkSet>),
}

/// Verifies Firebase ID tokens for one project.
pub struct FirebaseTokenVerifier {
    project_id: String,
    issuer: String,
    keys: KeySource,
}

impl std::fmt::Debug for FirebaseTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseTokenVerifier")
            .field("project_id", &self.project_id)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl FirebaseTokenVerifier {
    /// Create a verifier that fetches signing keys from `jwks_url`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unavailable` if the HTTP client cannot be built.
    pub fn new(project_id: &str, jwks_url: &str, key_cache_ttl: Duration) -> Result<Self, AuthError> {
        Self::remote(project_id, jwks_url, key_cache_ttl, MIN_KEY_REFRESH_INTERVAL)
    }

    fn remote(
        project_id: &str,
        jwks_url: &str,
        key_cache_ttl: Duration,
        min_refresh_interval: Duration,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(KEY_FETCH_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Unavailable(format!("http client: {e}")))?;

        Ok(Self {
            project_id: project_id.to_owned(),
            issuer: format!("{ISSUER_PREFIX}{project_id}"),
            keys: KeySource::Remote {
                client,
                url: jwks_url.to_owned(),
                cache: Cache::builder()
                    .max_capacity(1)
                    .time_to_live(key_cache_ttl)
                    .build(),
                recently_fetched: Cache::builder()
                    .max_capacity(1)
                    .time_to_live(min_refresh_interval)
                    .build(),
            },
        })
    }

    /// Create a verifier with a fixed key set.
    #[must_use]
    pub fn with_keys(project_id: &str, keys: JwkSet) -> Self {
        Self {
            project_id: project_id.to_owned(),
            issuer: format!("{ISSUER_PREFIX}{project_id}"),
            keys: KeySource::Static(Arc::new(keys)),
        }
    }

    async fn key_set(&self) -> Result<Arc<JwkSet>, AuthError> {
        match &self.keys {
            KeySource::Static(keys) => Ok(Arc::clone(keys)),
            KeySource::Remote {
                client,
                url,
                cache,
                recently_fetched,
            } => cache
                .try_get_with((), async {
                    let keys = fetch_key_set(client, url).await?;
                    recently_fetched.insert((), ()).await;
                    Ok::<_, AuthError>(keys)
                })
                .await
                .map_err(|e| match e.as_ref() {
                    AuthError::Unavailable(reason) => AuthError::Unavailable(reason.clone()),
                    other => AuthError::Unavailable(other.to_string()),
                }),
        }
    }

    /// Find the signing key for `kid`.
    ///
    /// Google rotates keys ahead of cache expiry, so an unknown `kid` forces
    /// one refetch unless the key set was fetched within the refresh interval.
    async fn find_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        if let Some(jwk) = self.key_set().await?.find(kid) {
            return Ok(jwk.clone());
        }

        if let KeySource::Remote {
            cache,
            recently_fetched,
            ..
        } = &self.keys
        {
            if recently_fetched.get(&()).await.is_some() {
                return Err(AuthError::InvalidToken(format!("unknown signing key '{kid}'")));
            }
            tracing::debug!(kid, "Signing key not cached, refreshing key set");
            recently_fetched.insert((), ()).await;
            cache.invalidate(&()).await;
            if let Some(jwk) = self.key_set().await?.find(kid) {
                return Ok(jwk.clone());
            }
        }

        Err(AuthError::InvalidToken(format!("unknown signing key '{kid}'")))
    }
}

async fn fetch_key_set(client: &reqwest::Client, url: &str) -> Result<Arc<JwkSet>, AuthError> {
    let keys: JwkSet = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| AuthError::Unavailable(format!("fetching signing keys: {e}")))?
        .json()
        .await
        .map_err(|e| AuthError::Unavailable(format!("decoding signing keys: {e}")))?;

    tracing::debug!(keys = keys.keys.len(), "Fetched signing keys");
    Ok(Arc::new(keys))
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::InvalidToken(err.to_string()),
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedSubject, AuthError> {
        let header = decode_header(token).map_err(|e| map_jwt_error(&e))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("missing key id".to_owned()))?;

        let jwk = self.find_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| AuthError::Unavailable(format!("unusable signing key '{kid}': {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        let claims = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| map_jwt_error(&e))?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_owned()));
        }

        Ok(AuthenticatedSubject {
            uid: claims.sub,
            email: claims.email,
        })
    }
}
