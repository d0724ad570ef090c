use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    StatusChanged,
    ShareEnabled,
    ShareDisabled,
    Viewed,
    Accepted,
    Declined,
    Expired,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Created => "created",
            ActivityAction::Updated => "updated",
            ActivityAction::StatusChanged => "status_changed",
            ActivityAction::ShareEnabled => "share_enabled",
            ActivityAction::ShareDisabled => "share_disabled",
            ActivityAction::Viewed => "viewed",
            ActivityAction::Accepted => "accepted",
            ActivityAction::Declined => "declined",
            ActivityAction::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "created" => ActivityAction::Created,
            "updated" => ActivityAction::Updated,
            "status_changed" => ActivityAction::StatusChanged,
            "share_enabled" => ActivityAction::ShareEnabled,
            "share_disabled" => ActivityAction::ShareDisabled,
            "viewed" => ActivityAction::Viewed,
            "accepted" => ActivityAction::Accepted,
            "declined" => ActivityAction::Declined,
            "expired" => ActivityAction::Expired,
            _ => return None,
        })
    }
}

/// Immutable audit record. The store only ever appends these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub proposal_id: Uuid,
    /// `None` when the action came through a public share link.
    pub actor_id: Option<Uuid>,
    pub action: ActivityAction,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub proposal_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: ActivityAction,
    pub details: Value,
}

impl NewActivity {
    pub fn by_owner(proposal_id: Uuid, owner: Uuid, action: ActivityAction, details: Value) -> Self {
        Self {
            proposal_id,
            actor_id: Some(owner),
            action,
            details,
        }
    }

    pub fn by_client(proposal_id: Uuid, action: ActivityAction, details: Value) -> Self {
        Self {
            proposal_id,
            actor_id: None,
            action,
            details,
        }
    }
}
