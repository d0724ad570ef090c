//! Stripe webhook verification and event interpretation.
//!
//! `verify_signature` checks the `Stripe-Signature` header; `interpret` maps
//! a verified event to a `BillingAction`; `apply` writes it through the store.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::billing::plans::Plan;
use crate::errors::AppError;
use crate::store::Store;

type HmacSha256 = Hmac<Sha256>;

/// Maximum clock skew between the signed timestamp and now.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("webhook secret is not configured")]
    MissingSecret,

    #[error("missing Stripe-Signature header")]
    MissingSignature,

    #[error("malformed Stripe-Signature header")]
    MalformedSignature,

    #[error("signature timestamp outside tolerance")]
    Expired,

    #[error("no signature matches the payload")]
    Mismatch,

    #[error("invalid event payload: {0}")]
    Payload(String),
}

impl From<WebhookError> for AppError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::MissingSecret => AppError::Internal(anyhow::anyhow!(e)),
            other => AppError::Validation(other.to_string()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Signature
// ────────────────────────────────────────────────────────────────────────────

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::MissingSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verifies `t=<unix>,v1=<hex>[,v1=<hex>...]` against `"{t}.{payload}"`.
/// Other schemes in the header (e.g. `v0`) are ignored.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => {
                timestamp = Some(v.parse::<i64>().map_err(|_| WebhookError::MalformedSignature)?)
            }
            Some(("v1", v)) => candidates.push(v),
            Some(_) => {}
            None => return Err(WebhookError::MalformedSignature),
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
    if candidates.is_empty() {
        return Err(WebhookError::MalformedSignature);
    }
    if now_unix.abs_diff(timestamp) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(WebhookError::Expired);
    }

    let mac = mac_for(secret, timestamp, payload)?;
    let matched = candidates
        .iter()
        .filter_map(|c| hex::decode(c).ok())
        .any(|sig| mac.clone().verify_slice(&sig).is_ok());

    if matched {
        Ok(())
    } else {
        Err(WebhookError::Mismatch)
    }
}

/// Builds a header value the way Stripe does. Used by tests and local tooling.
#[cfg(test)]
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mac = mac_for(secret, timestamp, payload).unwrap();
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

// ────────────────────────────────────────────────────────────────────────────
// Events
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingAction {
    /// Checkout completed: the user's plan and customer id are recorded.
    Activate {
        user_id: Uuid,
        plan: Plan,
        customer_id: Option<String>,
    },
    /// Subscription changed for a known customer.
    SetCustomerPlan { customer_id: String, plan: Plan },
    Ignore,
}

fn str_field<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

fn metadata_plan(object: &Value) -> Option<Plan> {
    object
        .get("metadata")
        .and_then(|m| m.get("plan"))
        .and_then(Value::as_str)
        .and_then(Plan::parse)
}

fn customer_id(object: &Value) -> Result<String, WebhookError> {
    str_field(object, "customer")
        .map(str::to_owned)
        .ok_or_else(|| WebhookError::Payload("missing customer".to_string()))
}

pub fn interpret(event: &StripeEvent) -> Result<BillingAction, WebhookError> {
    let object = &event.data.object;
    match event.kind.as_str() {
        "checkout.session.completed" => {
            let user_id = str_field(object, "client_reference_id")
                .and_then(|v| Uuid::parse_str(v).ok())
                .ok_or_else(|| WebhookError::Payload("missing client_reference_id".to_string()))?;
            let plan = metadata_plan(object)
                .ok_or_else(|| WebhookError::Payload("missing or unknown metadata.plan".to_string()))?;
            Ok(BillingAction::Activate {
                user_id,
                plan,
                customer_id: str_field(object, "customer").map(str::to_owned),
            })
        }
        "customer.subscription.updated" => {
            let customer_id = customer_id(object)?;
            let plan = match str_field(object, "status") {
                Some("active") | Some("trialing") => metadata_plan(object).unwrap_or_default(),
                _ => Plan::Free,
            };
            Ok(BillingAction::SetCustomerPlan { customer_id, plan })
        }
        "customer.subscription.deleted" => Ok(BillingAction::SetCustomerPlan {
            customer_id: customer_id(object)?,
            plan: Plan::Free,
        }),
        _ => Ok(BillingAction::Ignore),
    }
}

/// Returns whether a profile was updated.
pub async fn apply(store: &dyn Store, action: &BillingAction) -> Result<bool, AppError> {
    match action {
        BillingAction::Activate {
            user_id,
            plan,
            customer_id,
        } => {
            let updated = store.set_plan(*user_id, *plan, customer_id.as_deref()).await?;
            if updated {
                info!("Activated plan '{plan}' for user {user_id}");
            } else {
                warn!("Checkout completed for unknown user {user_id}");
            }
            Ok(updated)
        }
        BillingAction::SetCustomerPlan { customer_id, plan } => {
            let updated = store.set_plan_by_customer(customer_id, *plan).await?;
            if updated {
                info!("Set plan '{plan}' for customer {customer_id}");
            } else {
                warn!("Subscription event for unknown customer {customer_id}");
            }
            Ok(updated)
        }
        BillingAction::Ignore => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_760_000_000;

    fn event(kind: &str, object: Value) -> StripeEvent {
        serde_json::from_value(json!({ "id": "evt_1", "type": kind, "data": { "object": object } }))
            .unwrap()
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"type":"ping"}"#;
        let header = sign(body, SECRET, NOW);
        assert_eq!(verify_signature(body, &header, SECRET, NOW + 10), Ok(()));
    }

    #[test]
    fn test_any_matching_v1_accepted() {
        let body = b"{}";
        let good = sign(body, SECRET, NOW);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v0=abc,v1=deadbeef,v1={good_sig}");
        assert_eq!(verify_signature(body, &header, SECRET, NOW), Ok(()));
    }

    #[test]
    fn test_wrong_secret_or_body_rejected() {
        let body = b"{\"a\":1}";
        let header = sign(body, "whsec_other", NOW);
        assert_eq!(
            verify_signature(body, &header, SECRET, NOW),
            Err(WebhookError::Mismatch)
        );

        let header = sign(body, SECRET, NOW);
        assert_eq!(
            verify_signature(b"{\"a\":2}", &header, SECRET, NOW),
            Err(WebhookError::Mismatch)
        );
    }

    #[test]
    fn test_timestamp_outside_tolerance_rejected() {
        let body = b"{}";
        let header = sign(body, SECRET, NOW);
        assert_eq!(
            verify_signature(body, &header, SECRET, NOW + SIGNATURE_TOLERANCE_SECS + 1),
            Err(WebhookError::Expired)
        );
        assert_eq!(
            verify_signature(body, &header, SECRET, NOW - SIGNATURE_TOLERANCE_SECS - 1),
            Err(WebhookError::Expired)
        );
        assert!(verify_signature(body, &header, SECRET, NOW + SIGNATURE_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn test_malformed_headers() {
        for header in ["", "garbage", "t=abc,v1=00", "v1=00", "t=123"] {
            assert_eq!(
                verify_signature(b"{}", header, SECRET, 123),
                Err(WebhookError::MalformedSignature),
                "header {header:?}"
            );
        }
    }

    #[test]
    fn test_extreme_timestamps_are_expired() {
        for header in [
            "t=-9223372036854775808,v1=00",
            "t=9223372036854775807,v1=00",
        ] {
            assert_eq!(
                verify_signature(b"{}", header, SECRET, 1_700_000_000),
                Err(WebhookError::Expired),
                "header {header:?}"
            );
        }
        assert_eq!(
            verify_signature(b"{}", "t=0,v1=00", SECRET, i64::MIN),
            Err(WebhookError::Expired)
        );
    }

    #[test]
    fn test_interpret_checkout_completed() {
        let user = Uuid::new_v4();
        let action = interpret(&event(
            "checkout.session.completed",
            json!({
                "client_reference_id": user.to_string(),
                "customer": "cus_123",
                "metadata": { "plan": "pro" }
            }),
        ))
        .unwrap();
        assert_eq!(
            action,
            BillingAction::Activate {
                user_id: user,
                plan: Plan::Pro,
                customer_id: Some("cus_123".to_string())
            }
        );
    }

    #[test]
    fn test_interpret_checkout_without_plan_is_payload_error() {
        let result = interpret(&event(
            "checkout.session.completed",
            json!({ "client_reference_id": Uuid::new_v4().to_string() }),
        ));
        assert!(matches!(result, Err(WebhookError::Payload(_))));
    }

    #[test]
    fn test_interpret_subscription_updates() {
        let active = interpret(&event(
            "customer.subscription.updated",
            json!({ "customer": "cus_1", "status": "active", "metadata": { "plan": "agency" } }),
        ))
        .unwrap();
        assert_eq!(
            active,
            BillingAction::SetCustomerPlan {
                customer_id: "cus_1".to_string(),
                plan: Plan::Agency
            }
        );

        let past_due = interpret(&event(
            "customer.subscription.updated",
            json!({ "customer": "cus_1", "status": "past_due", "metadata": { "plan": "agency" } }),
        ))
        .unwrap();
        assert_eq!(
            past_due,
            BillingAction::SetCustomerPlan {
                customer_id: "cus_1".to_string(),
                plan: Plan::Free
            }
        );

        let deleted =
            interpret(&event("customer.subscription.deleted", json!({ "customer": "cus_1" })))
                .unwrap();
        assert_eq!(
            deleted,
            BillingAction::SetCustomerPlan {
                customer_id: "cus_1".to_string(),
                plan: Plan::Free
            }
        );
    }

    #[test]
    fn test_unknown_event_ignored() {
        let action = interpret(&event("invoice.paid", json!({}))).unwrap();
        assert_eq!(action, BillingAction::Ignore);
    }
}
