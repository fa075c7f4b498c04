//! Contact repository.
//!
//! [`ContactRepository`] is the domain-level port the handlers call.
//! [`PgContactRepository`] implements it over the persistence gateway with
//! runtime-checked sqlx queries and an explicit row mapping.

use async_trait::async_trait;
use sqlx::PgExecutor;

use contacts_core::{Contact, ContactId, NewContact};

use super::{Database, RepositoryError, map_write_error};

/// Persistence operations on contacts.
///
/// Object-safe so the handlers can hold any implementation behind an `Arc`.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Every contact, ordered by id.
    async fn list_all(&self) -> Result<Vec<Contact>, RepositoryError>;

    /// One contact, or `RepositoryError::NotFound`.
    async fn get_by_id(&self, id: ContactId) -> Result<Contact, RepositoryError>;

    /// Whether a contact with this identity triple exists.
    async fn exists_by_name_and_email(
        &self,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
    ) -> Result<bool, RepositoryError>;

    /// Store a new contact and return it with its assigned id.
    ///
    /// Fails with `RepositoryError::Conflict` when the identity triple is taken.
    async fn create(&self, contact: NewContact) -> Result<Contact, RepositoryError>;

    /// Overwrite every mutable field of an existing contact.
    ///
    /// Fails with `NotFound` for an unknown id and `Conflict` when the new
    /// identity triple belongs to another contact.
    async fn replace(&self, id: ContactId, contact: NewContact)
    -> Result<Contact, RepositoryError>;

    /// Remove a contact, or fail with `NotFound`.
    async fn delete(&self, id: ContactId) -> Result<(), RepositoryError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// A `contacts` row as returned by the store.
#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: i32,
    first_name: String,
    last_name: String,
    company: Option<String>,
    telephone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    notes: Option<String>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Self {
            id: ContactId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            company: row.company,
            telephone: row.telephone,
            email: row.email,
            address: row.address,
            notes: row.notes,
        }
    }
}

/// `PostgreSQL`-backed contact repository.
#[derive(Debug, Clone)]
pub struct PgContactRepository {
    db: Database,
}

impl PgContactRepository {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Number of stored contacts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        self.db
            .run("count", async {
                let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
                    .fetch_one(self.db.pool())
                    .await?;
                Ok(count)
            })
            .await
    }
}

async fn identity_exists<'e, E>(
    executor: E,
    first_name: &str,
    last_name: &str,
    email: Option<&str>,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar(
        r"
        SELECT EXISTS (
            SELECT 1 FROM contacts
            WHERE first_name = $1
              AND last_name = $2
              AND email IS NOT DISTINCT FROM $3
        )
        ",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .fetch_one(executor)
    .await
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn list_all(&self) -> Result<Vec<Contact>, RepositoryError> {
        self.db
            .run("list_all", async {
                let rows = sqlx::query_as::<_, ContactRow>(
                    r"
                    SELECT id, first_name, last_name, company, telephone, email, address, notes
                    FROM contacts
                    ORDER BY id
                    ",
                )
                .fetch_all(self.db.pool())
                .await?;

                Ok(rows.into_iter().map(Contact::from).collect())
            })
            .await
    }

    async fn get_by_id(&self, id: ContactId) -> Result<Contact, RepositoryError> {
        self.db
            .run("get_by_id", async {
                let row = sqlx::query_as::<_, ContactRow>(
                    r"
                    SELECT id, first_name, last_name, company, telephone, email, address, notes
                    FROM contacts
                    WHERE id = $1
                    ",
                )
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;

                row.map(Contact::from).ok_or(RepositoryError::NotFound)
            })
            .await
    }

    async fn exists_by_name_and_email(
        &self,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        self.db
            .run("exists_by_name_and_email", async {
                Ok(identity_exists(self.db.pool(), first_name, last_name, email).await?)
            })
            .await
    }

    async fn create(&self, contact: NewContact) -> Result<Contact, RepositoryError> {
        self.db
            .run("create", async {
                let mut tx = self.db.begin().await?;

                // Cheap early answer; the unique constraint is what actually
                // guarantees no duplicate under concurrent creates.
                if identity_exists(
                    &mut *tx,
                    &contact.first_name,
                    &contact.last_name,
                    contact.email.as_deref(),
                )
                .await?
                {
                    tx.rollback().await?;
                    return Err(RepositoryError::Conflict(
                        "contact already exists".to_owned(),
                    ));
                }

                let row = sqlx::query_as::<_, ContactRow>(
                    r"
                    INSERT INTO contacts
                        (first_name, last_name, company, telephone, email, address, notes)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id, first_name, last_name, company, telephone, email, address, notes
                    ",
                )
                .bind(&contact.first_name)
                .bind(&contact.last_name)
                .bind(&contact.company)
                .bind(&contact.telephone)
                .bind(&contact.email)
                .bind(&contact.address)
                .bind(&contact.notes)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_write_error)?;

                tx.commit().await?;

                Ok(Contact::from(row))
            })
            .await
    }

    async fn replace(
        &self,
        id: ContactId,
        contact: NewContact,
    ) -> Result<Contact, RepositoryError> {
        self.db
            .run("replace", async {
                let row = sqlx::query_as::<_, ContactRow>(
                    r"
                    UPDATE contacts
                    SET first_name = $2,
                        last_name = $3,
                        company = $4,
                        telephone = $5,
                        email = $6,
                        address = $7,
                        notes = $8
                    WHERE id = $1
                    RETURNING id, first_name, last_name, company, telephone, email, address, notes
                    ",
                )
                .bind(id)
                .bind(&contact.first_name)
                .bind(&contact.last_name)
                .bind(&contact.company)
                .bind(&contact.telephone)
                .bind(&contact.email)
                .bind(&contact.address)
                .bind(&contact.notes)
                .fetch_optional(self.db.pool())
                .await
                .map_err(map_write_error)?;

                row.map(Contact::from).ok_or(RepositoryError::NotFound)
            })
            .await
    }

    async fn delete(&self, id: ContactId) -> Result<(), RepositoryError> {
        self.db
            .run("delete", async {
                let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
                    .bind(id)
                    .execute(self.db.pool())
                    .await?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::NotFound);
                }

                Ok(())
            })
            .await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.db.ping().await
    }
}
