//! Database migration command.
//!
//! Migration files live in `crates/api/migrations/` and are embedded in the
//! `contacts-api` library as [`contacts_api::db::MIGRATOR`].

use contacts_api::db::MIGRATOR;

use super::{CommandError, connect};

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if configuration is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let db = connect().await?;

    tracing::info!("Running contacts migrations...");
    MIGRATOR.run(db.pool()).await?;

    tracing::info!("Contacts migrations complete!");
    Ok(())
}
