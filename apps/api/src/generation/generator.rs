//! Proposal generation: orchestrates the drafting pipeline.
//!
//! Flow: validate brief → quota check → load client/template → insert
//!       `generating` placeholder → resolve layout → LLM draft → normalize
//!       → store as `draft` → bump profile counter → log `created`.
//!
//! A failed draft removes the placeholder so no half-built row is left behind.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::generation::prompts::{build_system_prompt, build_user_prompt, prose_sections};
use crate::layout::{resolve_layout, Layout, SectionId};
use crate::llm_client::{DraftMode, LlmClient};
use crate::models::activity::{ActivityAction, NewActivity};
use crate::models::client::Client;
use crate::models::profile::Profile;
use crate::models::proposal::{
    ContentSection, NewProposal, PricingModel, Proposal, ProposalContent, ProposalPatch,
    ProposalStatus,
};
use crate::models::template::Template;
use crate::store::Store;

/// Proposals stay open for this long unless the owner edits `valid_until`.
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;
const UNTITLED: &str = "Untitled proposal";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub brief: String,
    pub title: Option<String>,
    pub client_id: Option<Uuid>,
    pub template_id: Option<Uuid>,
    /// Extended thinking. Honoured only on plans that include it.
    #[serde(default)]
    pub thinking: bool,
}

/// What the model returns: content plus a suggested title.
#[derive(Debug, Clone, Deserialize)]
pub struct DraftedProposal {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub content: ProposalContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Quota
// ────────────────────────────────────────────────────────────────────────────

/// First day of `now`'s UTC calendar month; the key usage is counted under.
pub fn usage_month(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive().with_day(1).unwrap_or_else(|| now.date_naive())
}

pub async fn check_quota(store: &dyn Store, profile: &Profile, now: DateTime<Utc>) -> Result<(), AppError> {
    let limits = profile.plan.limits();
    if limits.is_unlimited() {
        return Ok(());
    }

    let used = store.proposals_created_in(profile.id, usage_month(now)).await?;
    if limits.allows_another(used) {
        Ok(())
    } else {
        Err(AppError::PlanLimit(format!(
            "The {} plan includes {} proposals per month; upgrade to create more",
            limits.name, limits.proposals_per_month
        )))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

/// Fits the model's output to the layout: prose sections are kept only when
/// the layout renders them, in layout order, first occurrence wins, blank
/// headings take the section default. The pricing model is forced to the
/// template's.
pub fn normalize_draft(
    drafted: DraftedProposal,
    layout: &Layout,
    pricing_model: PricingModel,
    requested_title: Option<&str>,
) -> (String, ProposalContent) {
    let title = requested_title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| drafted.title.as_deref().map(str::trim).filter(|t| !t.is_empty()))
        .unwrap_or(UNTITLED)
        .to_string();

    let mut content = drafted.content;

    let mut sections: Vec<ContentSection> = Vec::new();
    for id in prose_sections(&layout.sections) {
        if let Some(mut section) = content.sections.iter().find(|s| s.section == id).cloned() {
            if section.heading.trim().is_empty() {
                section.heading = id.default_heading().to_string();
            }
            sections.push(section);
        }
    }
    content.sections = sections;
    content.summary = content.summary.trim().to_string();

    content.pricing.model = pricing_model;
    if content.pricing.currency.trim().is_empty() {
        content.pricing.currency = "USD".to_string();
    }
    content
        .pricing
        .items
        .retain(|item| item.check().is_ok());

    (title, content)
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

fn owned<T>(row: Option<T>, owner: impl Fn(&T) -> Uuid, caller: Uuid, what: &str) -> Result<T, AppError> {
    match row {
        Some(row) if owner(&row) == caller => Ok(row),
        // Someone else's row is reported as missing.
        _ => Err(AppError::NotFound(format!("{what} not found"))),
    }
}

pub async fn generate_proposal(
    store: &dyn Store,
    llm: &LlmClient,
    caller: &Identity,
    request: GenerateRequest,
) -> Result<Proposal, AppError> {
    let brief = request.brief.trim();
    if brief.is_empty() {
        return Err(AppError::Validation("brief cannot be empty".to_string()));
    }

    let now = Utc::now();
    let profile = store
        .ensure_profile(caller.user_id, caller.email.as_deref())
        .await?;
    check_quota(store, &profile, now).await?;

    let client: Option<Client> = match request.client_id {
        Some(id) => Some(owned(store.get_client(id).await?, |c| c.user_id, caller.user_id, "Client")?),
        None => None,
    };
    let template: Option<Template> = match request.template_id {
        Some(id) => Some(owned(
            store.get_template(id).await?,
            |t| t.user_id,
            caller.user_id,
            "Template",
        )?),
        None => None,
    };

    let limits = profile.plan.limits();
    let mode = match (request.thinking, limits.extended_thinking) {
        (true, true) => DraftMode::Thinking,
        (true, false) => {
            info!("Extended thinking not included in the {} plan; drafting in fast mode", limits.name);
            DraftMode::Fast
        }
        _ => DraftMode::Fast,
    };

    let placeholder = store
        .create_proposal(&NewProposal {
            user_id: caller.user_id,
            client_id: client.as_ref().map(|c| c.id),
            template_id: template.as_ref().map(|t| t.id),
            title: request
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(UNTITLED)
                .to_string(),
            status: ProposalStatus::Generating,
            content: ProposalContent::default(),
            valid_until: Some(now + Duration::days(DEFAULT_VALIDITY_DAYS)),
        })
        .await?;

    let layout = resolve_layout(&placeholder, template.as_ref());
    let pricing_model = template.as_ref().map(|t| t.pricing_model).unwrap_or_default();
    let system = build_system_prompt(template.as_ref(), profile.company_name.as_deref());
    let prompt = build_user_prompt(brief, client.as_ref(), &layout.sections, pricing_model);

    info!(
        "Drafting proposal {} ({:?} mode, {} sections)",
        placeholder.id,
        mode,
        layout.sections.len()
    );

    let drafted: DraftedProposal = match llm.draft_json(mode, &system, &prompt).await {
        Ok(drafted) => drafted,
        Err(e) => {
            warn!("Drafting failed for proposal {}: {e}", placeholder.id);
            if let Err(cleanup) = store.delete_proposal(placeholder.id).await {
                error!("Failed to remove placeholder proposal {}: {cleanup}", placeholder.id);
            }
            return Err(AppError::Llm(format!("Proposal drafting failed: {e}")));
        }
    };

    let (title, content) = normalize_draft(drafted, &layout, pricing_model, request.title.as_deref());
    let status = placeholder.status.transition(ProposalStatus::Draft)?;

    if title != placeholder.title {
        store
            .update_proposal(
                placeholder.id,
                &ProposalPatch {
                    title: Some(title),
                    ..ProposalPatch::default()
                },
            )
            .await?;
    }
    let proposal = store
        .set_content(placeholder.id, &content, status)
        .await?
        .ok_or_else(|| AppError::NotFound("Proposal not found".to_string()))?;

    store
        .record_proposal_created(caller.user_id, usage_month(now))
        .await?;
    store
        .append_activity(&NewActivity::by_owner(
            proposal.id,
            caller.user_id,
            ActivityAction::Created,
            json!({
                "thinking": mode == DraftMode::Thinking,
                "sections": layout.sections.iter().map(SectionId::as_str).collect::<Vec<_>>(),
            }),
        ))
        .await?;

    info!("Proposal {} drafted for user {}", proposal.id, caller.user_id);
    Ok(proposal)
}
