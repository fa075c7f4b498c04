//! Contact CRUD handlers.
//!
//! Updates are full replacements: every optional field omitted from a
//! `PATCH` body is stored as null. An `id` in a request body is ignored; the
//! store assigns ids on create and the path names the contact on update.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use contacts_core::{Contact, ContactId, NewContact};

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::state::AppState;

/// Request body for create and update.
#[derive(Debug, Deserialize)]
pub struct ContactPayload {
    /// Accepted for compatibility with clients that echo records back.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(flatten)]
    pub contact: NewContact,
}

/// Body of a successful delete.
#[derive(Debug, Serialize)]
pub struct DeletedPayload {
    pub message: &'static str,
}

/// Resolve the path id.
///
/// Any integer is accepted; one outside the id column's range can never have
/// been assigned, so it resolves to `NotFound` without touching the store.
fn contact_id(path: Result<Path<i64>, PathRejection>) -> Result<ContactId, AppError> {
    let Path(raw) = path.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    i32::try_from(raw).map(ContactId::new).map_err(|_| {
        tracing::info!(id = raw, "Contact id out of range");
        RepositoryError::NotFound.into()
    })
}

fn contact_body(body: Result<Json<ContactPayload>, JsonRejection>) -> Result<NewContact, AppError> {
    let Json(payload) = body.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    if payload.id.is_some() {
        tracing::debug!("Ignoring id in request body");
    }
    payload
        .contact
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(payload.contact)
}

/// `GET /contacts`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Contact>>, AppError> {
    tracing::info!("Getting all contacts");
    let contacts = state.contacts().list_all().await?;
    tracing::info!(count = contacts.len(), "Retrieved contacts");
    Ok(Json(contacts))
}

/// `GET /contacts/{id}`
pub async fn get(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Contact>, AppError> {
    let id = contact_id(path)?;
    tracing::info!(%id, "Getting contact");
    let contact = state.contacts().get_by_id(id).await?;
    Ok(Json(contact))
}

/// `POST /contacts`
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<ContactPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Contact>), AppError> {
    let new = contact_body(body)?;
    tracing::info!(
        first_name = %new.first_name,
        last_name = %new.last_name,
        "Creating contact"
    );

    match state.contacts().create(new).await {
        Ok(contact) => {
            tracing::info!(id = %contact.id, "Contact created");
            Ok((StatusCode::CREATED, Json(contact)))
        }
        Err(RepositoryError::Conflict(reason)) => {
            tracing::warn!(%reason, "Contact already exists");
            Err(RepositoryError::Conflict(reason).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// `PATCH /contacts/{id}`
pub async fn update(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ContactPayload>, JsonRejection>,
) -> Result<Json<Contact>, AppError> {
    let id = contact_id(path)?;
    let new = contact_body(body)?;
    tracing::info!(%id, "Updating contact");

    match state.contacts().replace(id, new).await {
        Ok(contact) => {
            tracing::info!(%id, "Contact updated");
            Ok(Json(contact))
        }
        Err(RepositoryError::Conflict(reason)) => {
            tracing::warn!(%id, %reason, "Update collides with another contact");
            Err(RepositoryError::Conflict(reason).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// `DELETE /contacts/{id}`
pub async fn delete(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeletedPayload>, AppError> {
    let id = contact_id(path)?;
    tracing::info!(%id, "Deleting contact");
    state.contacts().delete(id).await?;
    tracing::info!(%id, "Contact deleted");
    Ok(Json(DeletedPayload {
        message: "Contact deleted",
    }))
}
