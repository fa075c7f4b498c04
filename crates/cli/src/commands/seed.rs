//! Seed the database with sample contacts.
//!
//! Reads contacts from a YAML file and stores them through the contact
//! repository, so seeding obeys the same validation and uniqueness rules as
//! the API. Nothing is loaded when the table already has rows.

use serde::Deserialize;
use tracing::{info, warn};

use contacts_api::db::{ContactRepository, PgContactRepository, RepositoryError};
use contacts_core::NewContact;

use super::{CommandError, connect};

/// Sample contacts shipped with the binary, used when no file is given.
pub const SHIPPED_CONTACTS: &str = include_str!("../../seed/contacts.yaml");

/// Top level of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub contacts: Vec<NewContact>,
}

/// Outcome of a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

/// Parse and validate a seed file.
///
/// # Errors
///
/// Returns `CommandError::SeedFile` for invalid YAML or an entry with an
/// empty name.
pub fn parse_seed_file(content: &str) -> Result<SeedFile, CommandError> {
    let file: SeedFile = serde_yaml::from_str(content)?;

    for (index, contact) in file.contacts.iter().enumerate() {
        contact.validate().map_err(|e| {
            <serde_yaml::Error as serde::de::Error>::custom(format!("contact #{}: {e}", index + 1))
        })?;
    }

    Ok(file)
}

/// Store `contacts`, skipping any whose identity triple already exists.
///
/// # Errors
///
/// Returns `CommandError::Repository` on a storage failure.
pub async fn seed_contacts(
    repo: &dyn ContactRepository,
    contacts: Vec<NewContact>,
) -> Result<SeedReport, CommandError> {
    let mut report = SeedReport::default();

    for contact in contacts {
        let name = format!("{} {}", contact.first_name, contact.last_name);
        match repo.create(contact).await {
            Ok(created) => {
                info!(id = %created.id, %name, "Seeded contact");
                report.created += 1;
            }
            Err(RepositoryError::Conflict(_)) => {
                warn!(%name, "Contact already exists, skipping");
                report.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}

/// Read the seed contacts from `file_path`, or the shipped set without one.
///
/// # Errors
///
/// Returns `CommandError::Io` if the file cannot be read.
pub async fn load_seed(file_path: Option<&str>) -> Result<String, CommandError> {
    let Some(file_path) = file_path else {
        info!("Loading shipped sample contacts");
        return Ok(SHIPPED_CONTACTS.to_owned());
    };

    info!(path = %file_path, "Loading seed contacts from file");
    tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| CommandError::Io {
            path: file_path.to_owned(),
            source,
        })
}

/// Seed contacts into an empty database.
///
/// # Errors
///
/// Returns an error if configuration is missing, the file cannot be read or
/// parsed, or database operations fail.
pub async fn run(file_path: Option<&str>) -> Result<(), CommandError> {
    // Read and validate before connecting to the database
    let content = load_seed(file_path).await?;
    let file = parse_seed_file(&content)?;
    info!(contacts = file.contacts.len(), "Parsed seed file");

    let repo = PgContactRepository::new(connect().await?);

    let existing = repo.count().await?;
    if existing > 0 {
        info!(existing, "Database already has contacts, skipping seed");
        return Ok(());
    }

    let report = seed_contacts(&repo, file.contacts).await?;
    info!(
        created = report.created,
        skipped = report.skipped,
        "Seeding complete!"
    );

    Ok(())
}
