//! The contact entity.
//!
//! A [`Contact`] is the only persisted record. Its identity triple
//! (`first_name`, `last_name`, `email`) is unique across the store; an absent
//! email takes part in that comparison as a value of its own, so two contacts
//! with the same names and no email collide.

use serde::{Deserialize, Serialize};

use super::id::ContactId;

/// Errors raised when a contact payload fails validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    /// `first_name` is empty.
    #[error("first_name cannot be empty")]
    EmptyFirstName,
    /// `last_name` is empty.
    #[error("last_name cannot be empty")]
    EmptyLastName,
}

/// A stored contact.
///
/// `id` is assigned by the store on creation and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Every mutable field of a contact.
///
/// Used for both creation and replacement. Replacement overwrites all fields,
/// so a `None` here clears the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewContact {
    /// Create a payload with only the required names set.
    #[must_use]
    pub fn named(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            company: None,
            telephone: None,
            email: None,
            address: None,
            notes: None,
        }
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Check the required fields.
    ///
    /// # Errors
    ///
    /// Returns `ContactError::EmptyFirstName` or `ContactError::EmptyLastName`
    /// when a name is empty. Names are stored exactly as given, whitespace
    /// included.
    pub fn validate(&self) -> Result<(), ContactError> {
        if self.first_name.is_empty() {
            return Err(ContactError::EmptyFirstName);
        }
        if self.last_name.is_empty() {
            return Err(ContactError::EmptyLastName);
        }
        Ok(())
    }

    /// Whether `other` carries the same identity triple.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.first_name == other.first_name
            && self.last_name == other.last_name
            && self.email == other.email
    }

    /// Attach a store-assigned id.
    #[must_use]
    pub fn into_contact(self, id: ContactId) -> Contact {
        Contact {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            company: self.company,
            telephone: self.telephone,
            email: self.email,
            address: self.address,
            notes: self.notes,
        }
    }
}

impl Contact {
    /// The mutable fields of this contact, without its id.
    #[must_use]
    pub fn details(&self) -> NewContact {
        NewContact {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            company: self.company.clone(),
            telephone: self.telephone.clone(),
            email: self.email.clone(),
            address: self.address.clone(),
            notes: self.notes.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_names() {
        assert!(NewContact::named("Bilbo", "Baggins").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        assert_eq!(
            NewContact::named("", "Baggins").validate(),
            Err(ContactError::EmptyFirstName)
        );
        assert_eq!(
            NewContact::named("Bilbo", "").validate(),
            Err(ContactError::EmptyLastName)
        );
    }

    #[test]
    fn test_validate_keeps_whitespace_names() {
        assert!(NewContact::named("  ", "Baggins").validate().is_ok());
        assert!(NewContact::named("Bilbo", " ").validate().is_ok());
    }

    #[test]
    fn test_same_identity_compares_missing_email() {
        let a = NewContact::named("Harry", "Potter");
        let b = NewContact::named("Harry", "Potter");
        assert!(a.same_identity(&b));

        let c = NewContact::named("Harry", "Potter").with_email("hpotter@hogwarts.co.uk");
        assert!(!a.same_identity(&c));
    }

    #[test]
    fn test_same_identity_ignores_other_fields() {
        let mut a = NewContact::named("Mary", "Poppins").with_email("mary@poppins.co.uk");
        let b = a.clone();
        a.notes = Some("umbrella".to_owned());
        assert!(a.same_identity(&b));
    }

    #[test]
    fn test_optional_fields_default_to_none() {
        let parsed: NewContact =
            serde_json::from_str(r#"{"first_name":"Tony","last_name":"Stark"}"#).unwrap();
        assert_eq!(parsed, NewContact::named("Tony", "Stark"));
    }

    #[test]
    fn test_into_contact_and_details() {
        let new = NewContact::named("Peter", "Parker").with_email("peterparker@gmail.com");
        let contact = new.clone().into_contact(ContactId::new(3));
        assert_eq!(contact.id, ContactId::new(3));
        assert_eq!(contact.details(), new);
    }

    #[test]
    fn test_contact_serializes_nulls() {
        let contact = NewContact::named("Luke", "Skywalker").into_contact(ContactId::new(1));
        let value = serde_json::to_value(&contact).unwrap();
        assert_eq!(value["id"], 1);
        assert!(value["company"].is_null());
        assert!(value.get("notes").is_some());
    }
}
