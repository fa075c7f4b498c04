//! API configuration loaded from environment variables.
//!
//! Everything is resolved once at start-up; nothing is re-read while the
//! process runs. There is no compiled-in fallback for any credential: a
//! missing database password aborts start-up.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CONTACTS_DB_PASSWORD` - `PostgreSQL` password
//!
//! ## Optional
//! - `CONTACTS_HOST` - Bind address (default: 127.0.0.1)
//! - `CONTACTS_PORT` - Listen port (default: 8000)
//! - `CONTACTS_DB_USER` - `PostgreSQL` user (default: contacts)
//! - `CONTACTS_DB_HOST` - TCP host, or socket directory in socket mode (default: 127.0.0.1)
//! - `CONTACTS_DB_PORT` - TCP port / socket suffix (default: 5432)
//! - `CONTACTS_DB_NAME` - Database name (default: contacts)
//! - `CONTACTS_DB_TCP` - `true` for TCP, `false` for a unix socket (default: true)
//! - `CONTACTS_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `CONTACTS_DB_TIMEOUT_SECS` - Per-operation store timeout (default: 5)
//! - `CONTACTS_AUTH_SERVICE_ACCOUNT` - Path to the identity provider service-account JSON
//! - `CONTACTS_REQUIRE_AUTH` - Require a bearer token on `/contacts` (default: false)
//! - `CONTACTS_AUTH_JWKS_URL` - Signing-key set for bearer tokens (default: Google secure token)
//! - `CONTACTS_AUTH_KEY_CACHE_SECS` - Signing-key cache lifetime (default: 3600)
//! - `CONTACTS_CORS_ORIGINS` - Comma-separated allowed origins, `*` for any (default: *)
//! - `CONTACTS_LOG_JSON` - Emit JSON logs (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use secrecy::SecretString;
use thiserror::Error;

/// Google's published keys for Firebase ID tokens.
pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const MIN_DB_PASSWORD_LENGTH: usize = 8;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Relational store connection settings
    pub database: DatabaseConfig,
    /// Bearer-token verification settings
    pub auth: AuthConfig,
    /// Origins allowed by CORS
    pub cors_origins: CorsOrigins,
    /// Emit JSON-formatted logs
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// How the pool reaches `PostgreSQL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbTransport {
    /// TCP to `host:port`.
    Tcp,
    /// Unix socket in the `host` directory (e.g. a Cloud SQL socket mount).
    UnixSocket,
}

/// `PostgreSQL` connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: SecretString,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub transport: DbTransport,
    pub max_connections: u32,
    /// Upper bound for any single store operation.
    pub timeout: Duration,
}

/// Auth Gate settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Service-account bundle of the identity provider.
    pub service_account_path: Option<PathBuf>,
    /// Attach the Auth Gate to the contact routes.
    pub require_auth: bool,
    /// JWKS endpoint with the token signing keys.
    pub jwks_url: String,
    /// How long fetched signing keys are reused.
    pub key_cache_ttl: Duration,
}

/// Allowed CORS origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<HeaderValue>),
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the database password fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`ApiConfig::from_env`].
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = parse_env(lookup, "CONTACTS_HOST", "127.0.0.1")?;
        let port = parse_env(lookup, "CONTACTS_PORT", "8000")?;
        let database = DatabaseConfig::from_lookup(lookup)?;
        let auth = AuthConfig::from_lookup(lookup)?;
        let cors_origins = parse_cors_origins(&get_env_or_default(
            lookup,
            "CONTACTS_CORS_ORIGINS",
            "*",
        ))?;
        let log_json = parse_bool(lookup, "CONTACTS_LOG_JSON", false)?;

        Ok(Self {
            host,
            port,
            database,
            auth,
            cors_origins,
            log_json,
            sentry_dsn: get_optional_env(lookup, "SENTRY_DSN"),
            sentry_environment: get_optional_env(lookup, "SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl DatabaseConfig {
    /// Load only the store settings (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the password is missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let password = get_required_env(lookup, "CONTACTS_DB_PASSWORD")?;
        validate_password(&password, "CONTACTS_DB_PASSWORD")?;

        let transport = if parse_bool(lookup, "CONTACTS_DB_TCP", true)? {
            DbTransport::Tcp
        } else {
            DbTransport::UnixSocket
        };

        let max_connections: u32 = parse_env(lookup, "CONTACTS_DB_MAX_CONNECTIONS", "10")?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CONTACTS_DB_MAX_CONNECTIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            user: get_env_or_default(lookup, "CONTACTS_DB_USER", "contacts"),
            password: SecretString::from(password),
            host: get_env_or_default(lookup, "CONTACTS_DB_HOST", "127.0.0.1"),
            port: parse_env(lookup, "CONTACTS_DB_PORT", "5432")?,
            name: get_env_or_default(lookup, "CONTACTS_DB_NAME", "contacts"),
            transport,
            max_connections,
            timeout: parse_secs(lookup, "CONTACTS_DB_TIMEOUT_SECS", "5")?,
        })
    }

    /// Redacted connection description for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.transport {
            DbTransport::Tcp => format!(
                "postgres://{}@{}:{}/{}",
                self.user, self.host, self.port, self.name
            ),
            DbTransport::UnixSocket => {
                format!("postgres://{}@unix:{}/{}", self.user, self.host, self.name)
            }
        }
    }
}

impl AuthConfig {
    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            service_account_path: get_optional_env(lookup, "CONTACTS_AUTH_SERVICE_ACCOUNT")
                .map(PathBuf::from),
            require_auth: parse_bool(lookup, "CONTACTS_REQUIRE_AUTH", false)?,
            jwks_url: get_env_or_default(lookup, "CONTACTS_AUTH_JWKS_URL", DEFAULT_JWKS_URL),
            key_cache_ttl: parse_secs(lookup, "CONTACTS_AUTH_KEY_CACHE_SECS", "3600")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required, non-empty environment variable.
fn get_required_env(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    get_optional_env(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(lookup, key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a whole number of seconds.
fn parse_secs(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_env(lookup, key, default)?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse a boolean flag.
fn parse_bool(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = get_optional_env(lookup, key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Parse the CORS origin list.
fn parse_cors_origins(raw: &str) -> Result<CorsOrigins, ConfigError> {
    let origins: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .collect();

    if origins.is_empty() || origins.contains(&"*") {
        return Ok(CorsOrigins::Any);
    }

    origins
        .into_iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| {
                ConfigError::InvalidEnvVar("CONTACTS_CORS_ORIGINS".to_string(), e.to_string())
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(CorsOrigins::List)
}

/// Reject obviously unsafe database passwords.
fn validate_password(password: &str, var_name: &str) -> Result<(), ConfigError> {
    if password.len() < MIN_DB_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_DB_PASSWORD_LENGTH,
                password.len()
            ),
        ));
    }

    let lower = password.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}
