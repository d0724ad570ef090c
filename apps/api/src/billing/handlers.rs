//! Axum route handlers for plans and billing webhooks.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::billing::plans::{PlanLimits, PLANS};
use crate::billing::webhooks::{apply, interpret, verify_signature, StripeEvent, WebhookError};
use crate::errors::AppError;
use crate::state::AppState;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// GET /api/plans
pub async fn handle_list_plans() -> Json<Vec<PlanLimits>> {
    Json(PLANS.to_vec())
}

/// POST /api/webhooks/:provider
///
/// The body is taken as raw bytes: the signature covers the exact payload.
pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    if provider != "stripe" {
        return Err(AppError::NotFound(format!("Unknown webhook provider '{provider}'")));
    }

    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or(WebhookError::MissingSecret)?;
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    verify_signature(&body, signature, secret, Utc::now().timestamp())?;

    let event: StripeEvent =
        serde_json::from_slice(&body).map_err(|e| WebhookError::Payload(e.to_string()))?;
    debug!("Stripe event {:?} of type '{}'", event.id, event.kind);

    let action = interpret(&event)?;
    let applied = apply(state.store.as_ref(), &action).await?;
    info!("Processed Stripe event '{}' (applied: {applied})", event.kind);

    Ok(Json(json!({ "received": true })))
}
