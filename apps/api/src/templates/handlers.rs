//! Axum route handlers for the Templates API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::template::{NewTemplate, Template};
use crate::render::document::parse_hex_color;
use crate::state::AppState;
use crate::store::Store;

async fn load_owned(store: &dyn Store, id: Uuid, user: &AuthUser) -> Result<Template, AppError> {
    let template = store
        .get_template(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;
    if template.user_id != user.id() {
        return Err(AppError::Forbidden);
    }
    Ok(template)
}

/// GET /api/templates
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Template>>, AppError> {
    Ok(Json(state.store.list_templates(user.id()).await?))
}

/// POST /api/templates
///
/// An empty section list is allowed; rendering falls back to the default set.
pub async fn handle_create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<NewTemplate>,
) -> Result<(StatusCode, Json<Template>), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if let Some(color) = request.brand_color.as_deref() {
        if parse_hex_color(color).is_none() {
            return Err(AppError::Validation(format!(
                "brand_color '{color}' must be a #rrggbb hex color"
            )));
        }
    }

    let template = state.store.create_template(user.id(), &request).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// GET /api/templates/:id
pub async fn handle_get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Template>, AppError> {
    Ok(Json(load_owned(state.store.as_ref(), id, &user).await?))
}

/// DELETE /api/templates/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load_owned(state.store.as_ref(), id, &user).await?;
    state.store.delete_template(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
