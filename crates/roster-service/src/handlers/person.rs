//! Person CRUD handlers.
//!
//! Write operations return 202 Accepted. The `update_user` audit field
//! is taken from the authenticated principal attached by the auth
//! middleware.

use crate::auth::Principal;
use crate::errors::ApiError;
use crate::models::{IdResponse, Person, PersonPayload};
use crate::repositories::{NewPerson, PersonUpdate};
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Parse a path id, rejecting non-numeric values with a 400.
fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("ID is invalid".to_string()))
}

/// Email of the authenticated principal, or empty when absent.
fn update_user(principal: Option<Extension<Principal>>) -> String {
    principal
        .map(|Extension(p)| p.email)
        .unwrap_or_default()
}

/// Handler for GET /person.
#[instrument(skip_all, name = "roster.handlers.person.list")]
pub async fn list_people(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Person>>, ApiError> {
    let people = state.store.list().await?;
    Ok(Json(people))
}

/// Handler for GET /person/{id}.
#[instrument(skip_all, name = "roster.handlers.person.get")]
pub async fn get_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Person>, ApiError> {
    let id = parse_id(&id)?;

    match state.store.get(id).await? {
        Some(person) => Ok(Json(person)),
        None => Err(ApiError::NotFound("Person not found".to_string())),
    }
}

/// Handler for POST /person.
///
/// Returns 202 Accepted with the id of the created record.
#[instrument(skip_all, name = "roster.handlers.person.create")]
pub async fn create_person(
    State(state): State<Arc<AppState>>,
    principal: Option<Extension<Principal>>,
    Json(payload): Json<PersonPayload>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
    payload
        .validate()
        .map_err(|errors| ApiError::BadRequest(errors.join("; ")))?;

    let person = state
        .store
        .insert(NewPerson {
            name: payload.name,
            email: payload.email,
            update_user: update_user(principal),
        })
        .await?;

    Ok((StatusCode::ACCEPTED, Json(IdResponse { id: person.id })))
}

/// Handler for PUT /person/{id}.
///
/// Returns 202 Accepted, or 404 when no record matched.
#[instrument(skip_all, name = "roster.handlers.person.update")]
pub async fn update_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    principal: Option<Extension<Principal>>,
    Json(payload): Json<PersonPayload>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;

    payload
        .validate()
        .map_err(|errors| ApiError::BadRequest(errors.join("; ")))?;

    let affected = state
        .store
        .update(
            id,
            PersonUpdate {
                name: payload.name,
                email: payload.email,
                update_user: update_user(principal),
            },
        )
        .await?;

    if affected == 0 {
        return Err(ApiError::NotFound("Person not found".to_string()));
    }

    Ok(StatusCode::ACCEPTED)
}

/// Handler for DELETE /person/{id}.
///
/// Returns 202 Accepted, or 404 when no record matched.
#[instrument(skip_all, name = "roster.handlers.person.delete")]
pub async fn delete_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;

    let affected = state.store.delete(id).await?;

    if affected == 0 {
        return Err(ApiError::NotFound("Person not found".to_string()));
    }

    Ok(StatusCode::ACCEPTED)
}
