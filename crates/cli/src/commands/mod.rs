//! CLI subcommands.

pub mod migrate;
pub mod seed;

use contacts_api::config::DatabaseConfig;
use contacts_api::db::{self, Database};

/// Errors shared by the commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] contacts_api::config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] contacts_api::db::RepositoryError),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    SeedFile(#[from] serde_yaml::Error),
}

/// Load database settings from the environment and connect.
async fn connect() -> Result<Database, CommandError> {
    let config = DatabaseConfig::from_env()?;
    tracing::info!(database = %config.describe(), "Connecting to database...");
    let pool = db::create_pool(&config).await?;
    Ok(Database::new(pool, config.timeout))
}
