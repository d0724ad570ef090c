//! Axum route handler for proposal generation.

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::generation::generator::{generate_proposal, GenerateRequest};
use crate::models::proposal::Proposal;
use crate::state::AppState;

/// POST /api/proposals/generate
///
/// Drafts a new proposal from a brief. Returns the stored proposal in `draft`.
pub async fn handle_generate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<Proposal>), AppError> {
    let proposal = generate_proposal(state.store.as_ref(), &state.llm, &user.0, request).await?;
    Ok((StatusCode::CREATED, Json(proposal)))
}
