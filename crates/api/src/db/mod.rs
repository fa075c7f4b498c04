//! Persistence gateway for the contacts `PostgreSQL` database.
//!
//! Owns the connection pool, bounds every store operation with a timeout,
//! and turns driver errors into [`RepositoryError`]. Nothing here retries:
//! a failed operation is reported to the caller immediately.
//!
//! ## Tables
//!
//! - `contacts` - The contact records, unique on `(first_name, last_name, email)`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p contacts-cli -- migrate
//! ```

pub mod contacts;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

use crate::config::{DatabaseConfig, DbTransport};

pub use contacts::{ContactRepository, PgContactRepository};
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryContactRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The operation did not finish in time.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (duplicate identity triple).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether this is a lower-level storage failure rather than a domain outcome.
    #[must_use]
    pub const fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Timeout(_))
    }
}

/// Map a write error, turning unique violations into `Conflict`.
pub(crate) fn map_write_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("contact already exists".to_owned());
    }
    RepositoryError::Database(err)
}

/// Build connect options from configuration.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .username(&config.user)
        .password(config.password.expose_secret())
        .database(&config.name)
        .port(config.port)
        .application_name("contacts-api");

    match config.transport {
        DbTransport::Tcp => options.host(&config.host),
        DbTransport::UnixSocket => options.socket(&config.host),
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(config.timeout)
        .connect_with(connect_options(config))
        .await
}

/// Pooled database handle with a per-operation deadline.
///
/// Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    timeout: Duration,
}

impl Database {
    /// Wrap a pool.
    #[must_use]
    pub const fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Open a unit of work.
    ///
    /// Dropping the transaction without `commit` rolls it back, so every
    /// early return and every timeout leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if no connection can be acquired.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, RepositoryError> {
        Ok(self.pool.begin().await?)
    }

    /// Run a store operation under the configured deadline.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, or `RepositoryError::Timeout` if
    /// the deadline passes first (the operation is dropped).
    pub async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Store operation timed out"
                );
                Err(RepositoryError::Timeout(self.timeout))
            }
        }
    }

    /// Check connectivity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot answer `SELECT 1` in time.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.run("ping", async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_failure_classification() {
        assert!(RepositoryError::Database(sqlx::Error::PoolTimedOut).is_storage_failure());
        assert!(RepositoryError::Timeout(Duration::from_secs(1)).is_storage_failure());
        assert!(!RepositoryError::NotFound.is_storage_failure());
        assert!(!RepositoryError::Conflict("dup".to_owned()).is_storage_failure());
    }

    #[test]
    fn test_non_database_errors_are_not_conflicts() {
        let err = map_write_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::Database(_)));
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://contacts@localhost/contacts")
            .expect("lazy pool");
        let db = Database::new(pool, Duration::from_millis(10));

        let result: Result<(), _> = db
            .run("sleep", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(RepositoryError::Timeout(_))));
    }
}
