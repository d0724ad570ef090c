//! Persistence seam. Handlers talk to `dyn Store`; production uses `PgStore`,
//! router tests use the in-memory store.
//!
//! Ownership is NOT checked here. Handlers load a row, compare `user_id`, and
//! decide between 404 and 403 themselves.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::billing::plans::Plan;
use crate::errors::AppError;
use crate::models::activity::{ActivityEntry, NewActivity};
use crate::models::client::{Client, ClientPatch, NewClient};
use crate::models::profile::{Profile, ProfilePatch};
use crate::models::proposal::{NewProposal, Proposal, ProposalContent, ProposalPatch, ProposalStatus};
use crate::models::template::{NewTemplate, Template};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    // ── profiles ───────────────────────────────────────────────────────────
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, AppError>;
    /// Returns the profile, creating a free-plan row if the sign-up trigger never ran.
    async fn ensure_profile(&self, id: Uuid, email: Option<&str>) -> Result<Profile, AppError>;
    async fn update_profile(&self, id: Uuid, patch: &ProfilePatch) -> Result<Option<Profile>, AppError>;
    /// Bumps the lifetime `proposal_count` and the usage counter for `month`.
    /// Deleting a proposal never gives the slot back.
    async fn record_proposal_created(&self, id: Uuid, month: NaiveDate) -> Result<(), AppError>;
    /// Proposals created in `month` (its first day), deleted ones included.
    async fn proposals_created_in(&self, id: Uuid, month: NaiveDate) -> Result<i64, AppError>;
    /// Returns false when no profile matched.
    async fn set_plan(
        &self,
        id: Uuid,
        plan: Plan,
        stripe_customer_id: Option<&str>,
    ) -> Result<bool, AppError>;
    async fn set_plan_by_customer(&self, stripe_customer_id: &str, plan: Plan) -> Result<bool, AppError>;

    // ── clients ────────────────────────────────────────────────────────────
    async fn list_clients(&self, user_id: Uuid) -> Result<Vec<Client>, AppError>;
    async fn get_client(&self, id: Uuid) -> Result<Option<Client>, AppError>;
    async fn create_client(&self, user_id: Uuid, client: &NewClient) -> Result<Client, AppError>;
    async fn update_client(&self, id: Uuid, patch: &ClientPatch) -> Result<Option<Client>, AppError>;
    async fn delete_client(&self, id: Uuid) -> Result<bool, AppError>;

    // ── templates ──────────────────────────────────────────────────────────
    async fn list_templates(&self, user_id: Uuid) -> Result<Vec<Template>, AppError>;
    async fn get_template(&self, id: Uuid) -> Result<Option<Template>, AppError>;
    async fn create_template(&self, user_id: Uuid, template: &NewTemplate) -> Result<Template, AppError>;
    async fn delete_template(&self, id: Uuid) -> Result<bool, AppError>;

    // ── proposals ──────────────────────────────────────────────────────────
    async fn list_proposals(&self, user_id: Uuid) -> Result<Vec<Proposal>, AppError>;
    async fn get_proposal(&self, id: Uuid) -> Result<Option<Proposal>, AppError>;
    async fn get_proposal_by_share_token(&self, token: &str) -> Result<Option<Proposal>, AppError>;
    async fn create_proposal(&self, proposal: &NewProposal) -> Result<Proposal, AppError>;
    async fn update_proposal(&self, id: Uuid, patch: &ProposalPatch) -> Result<Option<Proposal>, AppError>;
    async fn set_content(
        &self,
        id: Uuid,
        content: &ProposalContent,
        status: ProposalStatus,
    ) -> Result<Option<Proposal>, AppError>;
    async fn set_status(&self, id: Uuid, status: ProposalStatus) -> Result<Option<Proposal>, AppError>;
    /// `token` is only written when `Some`; an existing token survives disabling.
    async fn set_sharing(
        &self,
        id: Uuid,
        enabled: bool,
        token: Option<&str>,
    ) -> Result<Option<Proposal>, AppError>;
    async fn delete_proposal(&self, id: Uuid) -> Result<bool, AppError>;

    // ── activity log (append-only) ─────────────────────────────────────────
    async fn append_activity(&self, entry: &NewActivity) -> Result<ActivityEntry, AppError>;
    async fn list_activity(&self, proposal_id: Uuid) -> Result<Vec<ActivityEntry>, AppError>;
}
