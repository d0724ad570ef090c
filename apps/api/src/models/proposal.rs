use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::layout::SectionId;

// ────────────────────────────────────────────────────────────────────────────
// Status state machine
// ────────────────────────────────────────────────────────────────────────────

/// Lifecycle status of a proposal.
///
/// Transitions are checked: see [`ProposalStatus::can_transition_to`].
/// `accepted`, `declined` and `expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Generating,
    Draft,
    Review,
    Sent,
    Accepted,
    Declined,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move proposal from '{from}' to '{to}'")]
pub struct InvalidTransition {
    pub from: ProposalStatus,
    pub to: ProposalStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown proposal status '{0}'")]
pub struct UnknownStatus(pub String);

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Generating => "generating",
            ProposalStatus::Draft => "draft",
            ProposalStatus::Review => "review",
            ProposalStatus::Sent => "sent",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Declined => "declined",
            ProposalStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Accepted | ProposalStatus::Declined | ProposalStatus::Expired
        )
    }

    /// Whether `next` is reachable from `self` in one step.
    /// Staying in the same status is always allowed (idempotent writes).
    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        use ProposalStatus::*;

        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Generating, Draft)
                | (Draft, Review)
                | (Draft, Sent)
                | (Review, Draft)
                | (Review, Sent)
                | (Sent, Accepted)
                | (Sent, Declined)
                | (Sent, Expired)
                | (Sent, Draft)
        )
    }

    pub fn transition(self, next: ProposalStatus) -> Result<ProposalStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generating" => Ok(ProposalStatus::Generating),
            "draft" => Ok(ProposalStatus::Draft),
            "review" => Ok(ProposalStatus::Review),
            "sent" => Ok(ProposalStatus::Sent),
            "accepted" => Ok(ProposalStatus::Accepted),
            "declined" => Ok(ProposalStatus::Declined),
            "expired" => Ok(ProposalStatus::Expired),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Content
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    #[default]
    Fixed,
    Hourly,
    Retainer,
    Milestone,
}

impl PricingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingModel::Fixed => "fixed",
            PricingModel::Hourly => "hourly",
            PricingModel::Retainer => "retainer",
            PricingModel::Milestone => "milestone",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    /// Price per unit in minor currency units.
    pub unit_price_cents: i64,
}

fn default_quantity() -> f64 {
    1.0
}

/// Upper bound for a single unit price: 1 billion in major units.
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000_000;
pub const MAX_QUANTITY: f64 = 1_000_000.0;

impl LineItem {
    /// Saturates instead of wrapping; `check` keeps stored items far below the bound.
    pub fn total_cents(&self) -> i64 {
        (self.quantity * self.unit_price_cents as f64).round() as i64
    }

    pub fn check(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("line item description cannot be empty".to_string());
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 || self.quantity > MAX_QUANTITY {
            return Err(format!(
                "quantity for '{}' must be greater than 0 and at most {MAX_QUANTITY}",
                self.description
            ));
        }
        if !(0..=MAX_UNIT_PRICE_CENTS).contains(&self.unit_price_cents) {
            return Err(format!(
                "unit_price_cents for '{}' must be between 0 and {MAX_UNIT_PRICE_CENTS}",
                self.description
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(default)]
    pub model: PricingModel,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Pricing {
    pub fn total_cents(&self) -> i64 {
        self.items
            .iter()
            .map(LineItem::total_cents)
            .fold(0, i64::saturating_add)
    }

    pub fn check(&self) -> Result<(), String> {
        self.items.iter().try_for_each(LineItem::check)
    }
}

/// A body-text section of a proposal, keyed by the layout slot it fills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub section: SectionId,
    pub heading: String,
    pub body: String,
}

/// Structured proposal content as stored in the `content` JSON column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposalContent {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub sections: Vec<ContentSection>,
    #[serde(default)]
    pub pricing: Pricing,
}

impl ProposalContent {
    pub fn section(&self, id: SectionId) -> Option<&ContentSection> {
        self.sections.iter().find(|s| s.section == id)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Proposal record
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub title: String,
    pub status: ProposalStatus,
    pub content: ProposalContent,
    pub share_token: Option<String>,
    pub share_enabled: bool,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn is_past_validity(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| until < now)
    }
}

/// Fields for a new proposal row. The store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewProposal {
    pub user_id: Uuid,
    pub client_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    pub title: String,
    pub status: ProposalStatus,
    pub content: ProposalContent,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Partial update applied by the owner. An absent field leaves the column
/// untouched; for the nullable columns an explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposalPatch {
    pub title: Option<String>,
    pub content: Option<ProposalContent>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub client_id: Option<Option<Uuid>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub template_id: Option<Option<Uuid>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub valid_until: Option<Option<DateTime<Utc>>>,
}
