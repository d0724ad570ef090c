use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::plans::Plan;
use crate::layout::FontFamily;

/// Application-level user record. `id` is shared with the identity provider's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub plan: Plan,
    pub proposal_count: i32,
    pub company_name: Option<String>,
    /// Hex colour, e.g. `#1e40af`.
    pub brand_color: Option<String>,
    pub accent_color: Option<String>,
    pub font: FontFamily,
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn branding(&self) -> Branding {
        Branding {
            company_name: self.company_name.clone(),
            brand_color: self.brand_color.clone(),
            accent_color: self.accent_color.clone(),
            font: self.font,
        }
    }
}

/// Branding fields consumed by the PDF renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Branding {
    pub company_name: Option<String>,
    pub brand_color: Option<String>,
    pub accent_color: Option<String>,
    #[serde(default)]
    pub font: FontFamily,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub company_name: Option<String>,
    pub brand_color: Option<String>,
    pub accent_color: Option<String>,
    pub font: Option<FontFamily>,
}
