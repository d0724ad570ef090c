//! Axum route handlers for the owner-facing Proposal API.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::layout::{resolve_layout, SectionId};
use crate::models::activity::{ActivityAction, ActivityEntry, NewActivity};
use crate::models::profile::{Branding, Profile};
use crate::models::proposal::{Proposal, ProposalPatch, ProposalStatus};
use crate::models::template::Template;
use crate::render::{pdf_filename, render_pdf, RenderJob};
use crate::state::AppState;
use crate::store::Store;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ProposalView {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub share_url: Option<String>,
    pub sections: Vec<SectionId>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ProposalStatus,
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub share_enabled: bool,
    pub share_token: Option<String>,
    pub share_url: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Missing → 404, someone else's → 403.
pub async fn load_owned(store: &dyn Store, id: Uuid, user: &AuthUser) -> Result<Proposal, AppError> {
    let proposal = store
        .get_proposal(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Proposal not found".to_string()))?;
    if !proposal.is_owned_by(user.id()) {
        return Err(AppError::Forbidden);
    }
    Ok(proposal)
}

/// The proposal's template, if it references one that still exists.
pub async fn referenced_template(store: &dyn Store, proposal: &Proposal) -> Result<Option<Template>, AppError> {
    match proposal.template_id {
        Some(id) => store.get_template(id).await,
        None => Ok(None),
    }
}

fn share_url(state: &AppState, proposal: &Proposal) -> Option<String> {
    proposal
        .share_token
        .as_deref()
        .filter(|_| proposal.share_enabled)
        .map(|token| state.config.share_url(token))
}

/// Branding for rendering. Plans without custom branding keep the company
/// name but use the default palette and font.
pub fn effective_branding(profile: &Profile, template: Option<&Template>) -> Branding {
    let mut branding = profile.branding();
    if !profile.plan.limits().custom_branding {
        return Branding {
            company_name: branding.company_name,
            ..Branding::default()
        };
    }
    if let Some(color) = template.and_then(|t| t.brand_color.clone()) {
        branding.brand_color = Some(color);
    }
    branding
}

async fn view(state: &AppState, proposal: Proposal) -> Result<ProposalView, AppError> {
    let template = referenced_template(state.store.as_ref(), &proposal).await?;
    let sections = resolve_layout(&proposal, template.as_ref()).sections;
    Ok(ProposalView {
        share_url: share_url(state, &proposal),
        sections,
        proposal,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/proposals
pub async fn handle_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Proposal>>, AppError> {
    Ok(Json(state.store.list_proposals(user.id()).await?))
}

/// GET /api/proposals/:id
pub async fn handle_get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProposalView>, AppError> {
    let proposal = load_owned(state.store.as_ref(), id, &user).await?;
    Ok(Json(view(&state, proposal).await?))
}

/// PATCH /api/proposals/:id
///
/// Edits title, content, client, template or validity. Rejected while the
/// proposal is still generating or once it has reached a terminal status.
pub async fn handle_update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProposalPatch>,
) -> Result<Json<ProposalView>, AppError> {
    let store = state.store.as_ref();
    let proposal = load_owned(store, id, &user).await?;

    if proposal.status == ProposalStatus::Generating || proposal.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "a '{}' proposal cannot be edited",
            proposal.status
        )));
    }
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    if let Some(content) = &patch.content {
        content.pricing.check().map_err(AppError::Validation)?;
    }
    if let Some(Some(client_id)) = patch.client_id {
        match store.get_client(client_id).await? {
            Some(c) if c.user_id == user.id() => {}
            _ => return Err(AppError::NotFound("Client not found".to_string())),
        }
    }
    if let Some(Some(template_id)) = patch.template_id {
        match store.get_template(template_id).await? {
            Some(t) if t.user_id == user.id() => {}
            _ => return Err(AppError::NotFound("Template not found".to_string())),
        }
    }

    let mut fields = Vec::new();
    if patch.title.is_some() {
        fields.push("title");
    }
    if patch.content.is_some() {
        fields.push("content");
    }
    if patch.client_id.is_some() {
        fields.push("client_id");
    }
    if patch.template_id.is_some() {
        fields.push("template_id");
    }
    if patch.valid_until.is_some() {
        fields.push("valid_until");
    }

    let updated = store
        .update_proposal(id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Proposal not found".to_string()))?;

    if !fields.is_empty() {
        store
            .append_activity(&NewActivity::by_owner(
                id,
                user.id(),
                ActivityAction::Updated,
                json!({ "fields": fields }),
            ))
            .await?;
    }

    Ok(Json(view(&state, updated).await?))
}

/// DELETE /api/proposals/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load_owned(state.store.as_ref(), id, &user).await?;
    state.store.delete_proposal(id).await?;
    info!("Proposal {id} deleted by {}", user.id());
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/proposals/:id/status
///
/// Checked transition. Re-sending the current status is a no-op.
pub async fn handle_set_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<ProposalView>, AppError> {
    let store = state.store.as_ref();
    let proposal = load_owned(store, id, &user).await?;

    let from = proposal.status;
    let to = from.transition(request.status)?;
    if from == to {
        return Ok(Json(view(&state, proposal).await?));
    }

    let updated = store
        .set_status(id, to)
        .await?
        .ok_or_else(|| AppError::NotFound("Proposal not found".to_string()))?;
    store
        .append_activity(&NewActivity::by_owner(
            id,
            user.id(),
            ActivityAction::StatusChanged,
            json!({ "from": from, "to": to }),
        ))
        .await?;
    info!("Proposal {id}: {from} -> {to}");

    Ok(Json(view(&state, updated).await?))
}

/// POST /api/proposals/:id/share
///
/// The token is minted on first enable and kept across disable/enable, so a
/// link that was sent once keeps working when sharing is turned back on.
pub async fn handle_share(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ShareRequest>,
) -> Result<Json<ShareResponse>, AppError> {
    let store = state.store.as_ref();
    let proposal = load_owned(store, id, &user).await?;

    if request.enabled && proposal.status == ProposalStatus::Generating {
        return Err(AppError::Conflict("proposal is still generating".to_string()));
    }

    let new_token = match (&proposal.share_token, request.enabled) {
        (None, true) => Some(Uuid::new_v4().simple().to_string()),
        _ => None,
    };

    let updated = store
        .set_sharing(id, request.enabled, new_token.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFound("Proposal not found".to_string()))?;

    if proposal.share_enabled != request.enabled {
        let action = if request.enabled {
            ActivityAction::ShareEnabled
        } else {
            ActivityAction::ShareDisabled
        };
        store
            .append_activity(&NewActivity::by_owner(id, user.id(), action, json!({})))
            .await?;
    }

    Ok(Json(ShareResponse {
        share_enabled: updated.share_enabled,
        share_url: share_url(&state, &updated),
        share_token: updated.share_token,
    }))
}

/// GET /api/proposals/:id/activity
pub async fn handle_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ActivityEntry>>, AppError> {
    load_owned(state.store.as_ref(), id, &user).await?;
    Ok(Json(state.store.list_activity(id).await?))
}

/// GET /api/proposals/:id/pdf
///
/// 401 unauthenticated → 404 unknown proposal → 403 not the owner →
/// 404 owner has no profile → 200 `application/pdf` attachment.
pub async fn handle_pdf(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let store = state.store.as_ref();
    let proposal = load_owned(store, id, &user).await?;
    let profile = store
        .get_profile(proposal.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    let template = referenced_template(store, &proposal).await?;
    let client_name = match proposal.client_id {
        Some(client_id) => store.get_client(client_id).await?.map(|c| c.name),
        None => None,
    };

    let filename = pdf_filename(&proposal.title);
    let job = RenderJob {
        layout: resolve_layout(&proposal, template.as_ref()),
        branding: effective_branding(&profile, template.as_ref()),
        client_name,
        issued_on: Utc::now().date_naive(),
        page_config: state.page_config.clone(),
        proposal,
    };
    let pdf = render_pdf(job).await?;
    info!("Rendered {filename} ({} bytes) for {}", pdf.len(), user.id());

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        Bytes::from(pdf),
    )
        .into_response())
}
