//! Layout resolver: decides which document sections a proposal renders, and in what order.
//!
//! Pure: no I/O. The caller loads the referenced template (if any) and passes it in.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::proposal::Proposal;
use crate::models::template::Template;

/// A renderable slot in a proposal document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    Cover,
    Summary,
    Problem,
    Solution,
    Deliverables,
    Timeline,
    Pricing,
    Terms,
    NextSteps,
}

impl SectionId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Cover => "cover",
            SectionId::Summary => "summary",
            SectionId::Problem => "problem",
            SectionId::Solution => "solution",
            SectionId::Deliverables => "deliverables",
            SectionId::Timeline => "timeline",
            SectionId::Pricing => "pricing",
            SectionId::Terms => "terms",
            SectionId::NextSteps => "next_steps",
        }
    }

    /// Heading used when the stored content does not provide one.
    pub fn default_heading(&self) -> &'static str {
        match self {
            SectionId::Cover => "Proposal",
            SectionId::Summary => "Executive Summary",
            SectionId::Problem => "The Challenge",
            SectionId::Solution => "Our Approach",
            SectionId::Deliverables => "Deliverables",
            SectionId::Timeline => "Timeline",
            SectionId::Pricing => "Investment",
            SectionId::Terms => "Terms & Conditions",
            SectionId::NextSteps => "Next Steps",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Section set used when a proposal has no usable template.
pub const DEFAULT_SECTIONS: [SectionId; 9] = [
    SectionId::Cover,
    SectionId::Summary,
    SectionId::Problem,
    SectionId::Solution,
    SectionId::Deliverables,
    SectionId::Timeline,
    SectionId::Pricing,
    SectionId::Terms,
    SectionId::NextSteps,
];

/// Ordered list of sections to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub sections: Vec<SectionId>,
}

impl Layout {
    pub fn default_sections() -> Self {
        Self {
            sections: DEFAULT_SECTIONS.to_vec(),
        }
    }
}

/// Resolves the layout for a proposal.
///
/// The template is only honoured when it is the one the proposal references.
/// Disabled toggles are skipped, duplicates keep their first position, and a
/// template that enables nothing falls back to the default set.
pub fn resolve_layout(proposal: &Proposal, template: Option<&Template>) -> Layout {
    let template = match (proposal.template_id, template) {
        (Some(referenced), Some(t)) if t.id == referenced => t,
        _ => return Layout::default_sections(),
    };

    let mut seen = HashSet::new();
    let sections: Vec<SectionId> = template
        .sections
        .iter()
        .filter(|toggle| toggle.enabled)
        .map(|toggle| toggle.section)
        .filter(|id| seen.insert(*id))
        .collect();

    if sections.is_empty() {
        return Layout::default_sections();
    }

    Layout { sections }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::proposal::{PricingModel, ProposalContent, ProposalStatus};
    use crate::models::template::SectionToggle;
    use chrono::Utc;
    use uuid::Uuid;

    fn make_proposal(template_id: Option<Uuid>) -> Proposal {
        Proposal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            client_id: None,
            template_id,
            title: "Website redesign".to_string(),
            status: ProposalStatus::Draft,
            content: ProposalContent::default(),
            share_token: None,
            share_enabled: false,
            valid_until: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn make_template(id: Uuid, toggles: Vec<(SectionId, bool)>) -> Template {
        Template {
            id,
            user_id: Uuid::new_v4(),
            name: "Agency standard".to_string(),
            brand_color: None,
            tone: None,
            pricing_model: PricingModel::Fixed,
            sections: toggles
                .into_iter()
                .map(|(section, enabled)| SectionToggle { section, enabled })
                .collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_template_reference_returns_defaults() {
        let proposal = make_proposal(None);
        assert_eq!(resolve_layout(&proposal, None), Layout::default_sections());
    }

    #[test]
    fn test_no_template_reference_ignores_passed_template() {
        let proposal = make_proposal(None);
        let template = make_template(Uuid::new_v4(), vec![(SectionId::Pricing, true)]);
        assert_eq!(
            resolve_layout(&proposal, Some(&template)),
            Layout::default_sections()
        );
    }

    #[test]
    fn test_missing_template_falls_back() {
        let proposal = make_proposal(Some(Uuid::new_v4()));
        assert_eq!(resolve_layout(&proposal, None), Layout::default_sections());
    }

    #[test]
    fn test_mismatched_template_falls_back() {
        let proposal = make_proposal(Some(Uuid::new_v4()));
        let other = make_template(Uuid::new_v4(), vec![(SectionId::Pricing, true)]);
        assert_eq!(
            resolve_layout(&proposal, Some(&other)),
            Layout::default_sections()
        );
    }

    #[test]
    fn test_template_order_and_toggles_respected() {
        let template_id = Uuid::new_v4();
        let proposal = make_proposal(Some(template_id));
        let template = make_template(
            template_id,
            vec![
                (SectionId::Cover, true),
                (SectionId::Pricing, true),
                (SectionId::Problem, false),
                (SectionId::Summary, true),
            ],
        );
        let layout = resolve_layout(&proposal, Some(&template));
        assert_eq!(
            layout.sections,
            vec![SectionId::Cover, SectionId::Pricing, SectionId::Summary]
        );
        assert!(!layout.sections.contains(&SectionId::Problem));
    }

    #[test]
    fn test_duplicate_toggles_keep_first_position() {
        let template_id = Uuid::new_v4();
        let proposal = make_proposal(Some(template_id));
        let template = make_template(
            template_id,
            vec![
                (SectionId::Summary, true),
                (SectionId::Terms, true),
                (SectionId::Summary, true),
            ],
        );
        assert_eq!(
            resolve_layout(&proposal, Some(&template)).sections,
            vec![SectionId::Summary, SectionId::Terms]
        );
    }

    #[test]
    fn test_all_disabled_falls_back() {
        let template_id = Uuid::new_v4();
        let proposal = make_proposal(Some(template_id));
        let template = make_template(
            template_id,
            vec![(SectionId::Summary, false), (SectionId::Pricing, false)],
        );
        assert_eq!(
            resolve_layout(&proposal, Some(&template)),
            Layout::default_sections()
        );
    }

    #[test]
    fn test_section_id_serde_matches_as_str() {
        for id in DEFAULT_SECTIONS {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
    }
}
