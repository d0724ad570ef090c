//! Plan tiers and their fixed business limits.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel for "no monthly cap".
pub const UNLIMITED: i32 = -1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Agency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub plan: Plan,
    pub name: &'static str,
    /// Monthly price in cents.
    pub price_monthly: i64,
    /// `UNLIMITED` (-1) means no cap.
    pub proposals_per_month: i32,
    pub custom_branding: bool,
    pub extended_thinking: bool,
}

/// Ordered free → agency.
pub const PLANS: [PlanLimits; 3] = [
    PlanLimits {
        plan: Plan::Free,
        name: "Free",
        price_monthly: 0,
        proposals_per_month: 5,
        custom_branding: false,
        extended_thinking: false,
    },
    PlanLimits {
        plan: Plan::Pro,
        name: "Pro",
        price_monthly: 2900,
        proposals_per_month: 50,
        custom_branding: true,
        extended_thinking: true,
    },
    PlanLimits {
        plan: Plan::Agency,
        name: "Agency",
        price_monthly: 7900,
        proposals_per_month: UNLIMITED,
        custom_branding: true,
        extended_thinking: true,
    },
];

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Agency => "agency",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Plan::Free),
            "pro" => Some(Plan::Pro),
            "agency" => Some(Plan::Agency),
            _ => None,
        }
    }

    pub fn limits(&self) -> &'static PlanLimits {
        match self {
            Plan::Free => &PLANS[0],
            Plan::Pro => &PLANS[1],
            Plan::Agency => &PLANS[2],
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PlanLimits {
    pub fn is_unlimited(&self) -> bool {
        self.proposals_per_month == UNLIMITED
    }

    /// Whether one more proposal may be created given `used_this_month`.
    pub fn allows_another(&self, used_this_month: i64) -> bool {
        self.is_unlimited() || used_this_month < self.proposals_per_month as i64
    }
}
