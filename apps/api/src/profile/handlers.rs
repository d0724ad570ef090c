//! Axum route handlers for the signed-in user's profile.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::billing::plans::PlanLimits;
use crate::errors::AppError;
use crate::generation::generator::usage_month;
use crate::models::profile::{Profile, ProfilePatch};
use crate::render::document::parse_hex_color;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub limits: PlanLimits,
    pub proposals_this_month: i64,
}

async fn respond(state: &AppState, profile: Profile) -> Result<Json<ProfileResponse>, AppError> {
    let proposals_this_month = state
        .store
        .proposals_created_in(profile.id, usage_month(Utc::now()))
        .await?;
    Ok(Json(ProfileResponse {
        limits: *profile.plan.limits(),
        proposals_this_month,
        profile,
    }))
}

/// GET /api/profile
///
/// Creates the profile on first access when the sign-up trigger has not.
pub async fn handle_get(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state
        .store
        .ensure_profile(user.id(), user.0.email.as_deref())
        .await?;
    respond(&state, profile).await
}

/// PATCH /api/profile
pub async fn handle_update(
    State(state): State<AppState>,
    user: AuthUser,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<ProfileResponse>, AppError> {
    for (field, value) in [("brand_color", &patch.brand_color), ("accent_color", &patch.accent_color)] {
        if let Some(color) = value.as_deref() {
            if parse_hex_color(color).is_none() {
                return Err(AppError::Validation(format!(
                    "{field} '{color}' must be a #rrggbb hex color"
                )));
            }
        }
    }

    state
        .store
        .ensure_profile(user.id(), user.0.email.as_deref())
        .await?;
    let profile = state
        .store
        .update_profile(user.id(), &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    respond(&state, profile).await
}
