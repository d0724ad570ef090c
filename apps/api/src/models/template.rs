use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::SectionId;
use crate::models::proposal::PricingModel;

/// One slot in a template's section list. Order in the list is render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionToggle {
    pub section: SectionId,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// Reusable content/style configuration applied when generating a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub brand_color: Option<String>,
    /// Free-text tone guidance passed to the drafting prompt.
    pub tone: Option<String>,
    pub pricing_model: PricingModel,
    pub sections: Vec<SectionToggle>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub brand_color: Option<String>,
    pub tone: Option<String>,
    #[serde(default)]
    pub pricing_model: PricingModel,
    #[serde(default)]
    pub sections: Vec<SectionToggle>,
}
