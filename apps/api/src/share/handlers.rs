//! Public share-link endpoints. No authentication: the token is the credential.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::{resolve_layout, SectionId};
use crate::models::activity::{ActivityAction, NewActivity};
use crate::models::profile::Branding;
use crate::models::proposal::{Proposal, ProposalContent, ProposalStatus};
use crate::proposals::handlers::{effective_branding, referenced_template};
use crate::state::AppState;
use crate::store::Store;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub accepted: bool,
}

/// Read-only projection for the client. Owner ids and tokens are left out.
#[derive(Debug, Serialize)]
pub struct PublicProposal {
    pub id: Uuid,
    pub title: String,
    pub status: ProposalStatus,
    pub content: ProposalContent,
    pub sections: Vec<SectionId>,
    pub valid_until: Option<DateTime<Utc>>,
    pub client_name: Option<String>,
    pub branding: Branding,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Unknown token and disabled sharing look the same from outside.
async fn load_shared(store: &dyn Store, token: &str) -> Result<Proposal, AppError> {
    match store.get_proposal_by_share_token(token).await? {
        Some(p) if p.share_enabled && p.status != ProposalStatus::Generating => Ok(p),
        _ => Err(AppError::NotFound("Shared proposal not found".to_string())),
    }
}

/// Moves a `sent` proposal past its validity date to `expired`.
/// Returns the (possibly updated) proposal.
async fn expire_if_due(store: &dyn Store, proposal: Proposal, now: DateTime<Utc>) -> Result<Proposal, AppError> {
    if proposal.status != ProposalStatus::Sent || !proposal.is_past_validity(now) {
        return Ok(proposal);
    }

    let to = proposal.status.transition(ProposalStatus::Expired)?;
    let expired = store
        .set_status(proposal.id, to)
        .await?
        .ok_or_else(|| AppError::NotFound("Shared proposal not found".to_string()))?;
    store
        .append_activity(&NewActivity::by_client(
            proposal.id,
            ActivityAction::Expired,
            json!({ "valid_until": proposal.valid_until }),
        ))
        .await?;
    info!("Proposal {} expired (valid until {:?})", proposal.id, proposal.valid_until);
    Ok(expired)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/share/:token
///
/// The first view of a `sent` proposal is logged as `viewed`.
pub async fn handle_view(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<PublicProposal>, AppError> {
    let store = state.store.as_ref();
    let proposal = load_shared(store, &token).await?;
    let proposal = expire_if_due(store, proposal, Utc::now()).await?;

    if proposal.status == ProposalStatus::Sent {
        let seen = store
            .list_activity(proposal.id)
            .await?
            .iter()
            .any(|a| a.action == ActivityAction::Viewed);
        if !seen {
            store
                .append_activity(&NewActivity::by_client(proposal.id, ActivityAction::Viewed, json!({})))
                .await?;
            info!("Proposal {} viewed for the first time", proposal.id);
        }
    }

    let template = referenced_template(store, &proposal).await?;
    let branding = match store.get_profile(proposal.user_id).await? {
        Some(profile) => effective_branding(&profile, template.as_ref()),
        None => Branding::default(),
    };
    let client_name = match proposal.client_id {
        Some(id) => store.get_client(id).await?.map(|c| c.name),
        None => None,
    };

    Ok(Json(PublicProposal {
        id: proposal.id,
        sections: resolve_layout(&proposal, template.as_ref()).sections,
        title: proposal.title,
        status: proposal.status,
        content: proposal.content,
        valid_until: proposal.valid_until,
        client_name,
        branding,
    }))
}

/// POST /api/share/:token/respond
///
/// `{ "accepted": bool }`. `sent` → accepted/declined. Repeating the same
/// answer is accepted without a status change but is still logged.
pub async fn handle_respond(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = body.map_err(|e| {
        debug!("Rejected share response body: {e}");
        AppError::Validation("body must be {\"accepted\": true|false}".to_string())
    })?;

    let store = state.store.as_ref();
    let proposal = load_shared(store, &token).await?;
    let proposal = expire_if_due(store, proposal, Utc::now()).await?;

    let (target, action) = if request.accepted {
        (ProposalStatus::Accepted, ActivityAction::Accepted)
    } else {
        (ProposalStatus::Declined, ActivityAction::Declined)
    };

    match proposal.status {
        ProposalStatus::Sent => {
            let to = proposal.status.transition(target)?;
            store
                .set_status(proposal.id, to)
                .await?
                .ok_or_else(|| AppError::NotFound("Shared proposal not found".to_string()))?;
            info!("Proposal {} {} by client", proposal.id, to);
        }
        current if current == target => {
            debug!("Repeated '{current}' response for proposal {}", proposal.id);
        }
        ProposalStatus::Expired => {
            return Err(AppError::Conflict("this proposal has expired".to_string()));
        }
        current if current.is_terminal() => {
            return Err(AppError::Conflict(format!("this proposal was already {current}")));
        }
        _ => {
            return Err(AppError::Conflict("this proposal has not been sent".to_string()));
        }
    }

    store
        .append_activity(&NewActivity::by_client(
            proposal.id,
            action,
            json!({ "via": "share_link" }),
        ))
        .await?;

    Ok(Json(json!({ "success": true })))
}
