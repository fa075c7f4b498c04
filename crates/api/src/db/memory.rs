//! In-memory contact repository for tests.
//!
//! Mirrors the `PostgreSQL` semantics: ids are assigned from a counter and
//! never reused, identity triples are unique, and lookups of unknown ids fail
//! with `NotFound`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use contacts_core::{Contact, ContactId, NewContact};

use super::{ContactRepository, RepositoryError};

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i32,
    contacts: BTreeMap<ContactId, Contact>,
    unavailable: bool,
}

impl MemoryState {
    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn identity_taken(&self, contact: &NewContact, except: Option<ContactId>) -> bool {
        self.contacts
            .values()
            .filter(|existing| Some(existing.id) != except)
            .any(|existing| existing.details().same_identity(contact))
    }
}

/// Contact repository backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryContactRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryContactRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail as a storage failure.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn list_all(&self) -> Result<Vec<Contact>, RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state.contacts.values().cloned().collect())
    }

    async fn get_by_id(&self, id: ContactId) -> Result<Contact, RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;
        state
            .contacts
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn exists_by_name_and_email(
        &self,
        first_name: &str,
        last_name: &str,
        email: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let state = self.state.lock().await;
        state.check_available()?;
        Ok(state.contacts.values().any(|c| {
            c.first_name == first_name && c.last_name == last_name && c.email.as_deref() == email
        }))
    }

    async fn create(&self, contact: NewContact) -> Result<Contact, RepositoryError> {
        let mut state = self.state.lock().await;
        state.check_available()?;

        if state.identity_taken(&contact, None) {
            return Err(RepositoryError::Conflict(
                "contact already exists".to_owned(),
            ));
        }

        state.last_id += 1;
        let id = ContactId::new(state.last_id);
        let stored = contact.into_contact(id);
        state.contacts.insert(id, stored.clone());
        Ok(stored)
    }

    async fn replace(
        &self,
        id: ContactId,
        contact: NewContact,
    ) -> Result<Contact, RepositoryError> {
        let mut state = self.state.lock().await;
        state.check_available()?;

        if !state.contacts.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if state.identity_taken(&contact, Some(id)) {
            return Err(RepositoryError::Conflict(
                "contact already exists".to_owned(),
            ));
        }

        let stored = contact.into_contact(id);
        state.contacts.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: ContactId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.check_available()?;
        state
            .contacts
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.state.lock().await.check_available()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let repo = InMemoryContactRepository::new();
        let first = repo.create(NewContact::named("A", "One")).await.unwrap();
        repo.delete(first.id).await.unwrap();
        let second = repo.create(NewContact::named("B", "Two")).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_replace_onto_own_identity_is_allowed() {
        let repo = InMemoryContactRepository::new();
        let created = repo
            .create(NewContact::named("Frank", "Flintstone"))
            .await
            .unwrap();

        let mut details = created.details();
        details.notes = Some("yabba dabba doo".to_owned());
        let replaced = repo.replace(created.id, details).await.unwrap();

        assert_eq!(replaced.notes.as_deref(), Some("yabba dabba doo"));
    }

    #[tokio::test]
    async fn test_replace_onto_other_identity_conflicts() {
        let repo = InMemoryContactRepository::new();
        repo.create(NewContact::named("Harvey", "Specter"))
            .await
            .unwrap();
        let other = repo
            .create(NewContact::named("Mike", "Ross"))
            .await
            .unwrap();

        let result = repo
            .replace(other.id, NewContact::named("Harvey", "Specter"))
            .await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_exists_matches_missing_email() {
        let repo = InMemoryContactRepository::new();
        repo.create(NewContact::named("Bilbo", "Baggins"))
            .await
            .unwrap();

        assert!(
            repo.exists_by_name_and_email("Bilbo", "Baggins", None)
                .await
                .unwrap()
        );
        assert!(
            !repo
                .exists_by_name_and_email("Bilbo", "Baggins", Some("bilbo@gmail.com"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_everything() {
        let repo = InMemoryContactRepository::new();
        repo.set_unavailable(true).await;

        assert!(matches!(
            repo.list_all().await,
            Err(RepositoryError::Database(_))
        ));
        assert!(repo.ping().await.is_err());
    }
}
