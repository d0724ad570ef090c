//! Axum route handlers for the Clients API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::client::{Client, ClientPatch, NewClient};
use crate::state::AppState;
use crate::store::Store;

async fn load_owned(store: &dyn Store, id: Uuid, user: &AuthUser) -> Result<Client, AppError> {
    let client = store
        .get_client(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    if client.user_id != user.id() {
        return Err(AppError::Forbidden);
    }
    Ok(client)
}

fn validate_email(email: Option<&str>) -> Result<(), AppError> {
    match email {
        Some(e) if !e.contains('@') => Err(AppError::Validation(format!("invalid email '{e}'"))),
        _ => Ok(()),
    }
}

/// GET /api/clients
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Client>>, AppError> {
    Ok(Json(state.store.list_clients(user.id()).await?))
}

/// POST /api/clients
pub async fn handle_create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<NewClient>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    validate_email(request.email.as_deref())?;

    let client = state.store.create_client(user.id(), &request).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /api/clients/:id
pub async fn handle_get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    Ok(Json(load_owned(state.store.as_ref(), id, &user).await?))
}

/// PATCH /api/clients/:id
pub async fn handle_update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<ClientPatch>,
) -> Result<Json<Client>, AppError> {
    load_owned(state.store.as_ref(), id, &user).await?;
    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    validate_email(patch.email.as_deref())?;

    let client = state
        .store
        .update_client(id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    Ok(Json(client))
}

/// DELETE /api/clients/:id
///
/// Proposals keep their rows; their client reference is cleared by the schema.
pub async fn handle_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load_owned(state.store.as_ref(), id, &user).await?;
    state.store.delete_client(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
