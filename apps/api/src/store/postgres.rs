use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::billing::plans::Plan;
use crate::errors::AppError;
use crate::layout::FontFamily;
use crate::models::activity::{ActivityAction, ActivityEntry, NewActivity};
use crate::models::client::{Client, ClientPatch, NewClient};
use crate::models::profile::{Profile, ProfilePatch};
use crate::models::proposal::{
    NewProposal, PricingModel, Proposal, ProposalContent, ProposalPatch, ProposalStatus,
};
use crate::models::template::{NewTemplate, SectionToggle, Template};
use crate::store::Store;

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Row types are column-shaped and converted to domain models on the way out
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    email: Option<String>,
    plan: String,
    proposal_count: i32,
    company_name: Option<String>,
    brand_color: Option<String>,
    accent_color: Option<String>,
    font: String,
    stripe_customer_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let plan = Plan::parse(&row.plan)
            .ok_or_else(|| anyhow!("profile {} has unknown plan '{}'", row.id, row.plan))?;
        Ok(Profile {
            id: row.id,
            email: row.email,
            plan,
            proposal_count: row.proposal_count,
            company_name: row.company_name,
            brand_color: row.brand_color,
            accent_color: row.accent_color,
            font: FontFamily::parse(&row.font).unwrap_or_default(),
            stripe_customer_id: row.stripe_customer_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ClientRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    company: Option<String>,
    email: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            company: row.company,
            email: row.email,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct TemplateRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    brand_color: Option<String>,
    tone: Option<String>,
    pricing_model: String,
    sections: Json<Vec<SectionToggle>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_pricing_model(s: &str) -> PricingModel {
    match s {
        "hourly" => PricingModel::Hourly,
        "retainer" => PricingModel::Retainer,
        "milestone" => PricingModel::Milestone,
        _ => PricingModel::Fixed,
    }
}

impl From<TemplateRow> for Template {
    fn from(row: TemplateRow) -> Self {
        Template {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            brand_color: row.brand_color,
            tone: row.tone,
            pricing_model: parse_pricing_model(&row.pricing_model),
            sections: row.sections.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProposalRow {
    id: Uuid,
    user_id: Uuid,
    client_id: Option<Uuid>,
    template_id: Option<Uuid>,
    title: String,
    status: String,
    content: Json<ProposalContent>,
    share_token: Option<String>,
    share_enabled: bool,
    valid_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProposalRow> for Proposal {
    type Error = AppError;

    fn try_from(row: ProposalRow) -> Result<Self, Self::Error> {
        let status: ProposalStatus = row
            .status
            .parse()
            .map_err(|e| AppError::Internal(anyhow!("proposal {}: {e}", row.id)))?;
        Ok(Proposal {
            id: row.id,
            user_id: row.user_id,
            client_id: row.client_id,
            template_id: row.template_id,
            title: row.title,
            status,
            content: row.content.0,
            share_token: row.share_token,
            share_enabled: row.share_enabled,
            valid_until: row.valid_until,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    id: Uuid,
    proposal_id: Uuid,
    actor_id: Option<Uuid>,
    action: String,
    details: Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for ActivityEntry {
    type Error = AppError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let action = ActivityAction::parse(&row.action)
            .ok_or_else(|| anyhow!("activity {} has unknown action '{}'", row.id, row.action))?;
        Ok(ActivityEntry {
            id: row.id,
            proposal_id: row.proposal_id,
            actor_id: row.actor_id,
            action,
            details: row.details,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn convert_opt<R, T>(row: Option<R>) -> Result<Option<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    row.map(T::try_from).transpose()
}

// ────────────────────────────────────────────────────────────────────────────
// Store impl
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl Store for PgStore {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        let row: Option<ProfileRow> = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        convert_opt(row)
    }

    async fn ensure_profile(&self, id: Uuid, email: Option<&str>) -> Result<Profile, AppError> {
        // No-op when the sign-up trigger already created the row.
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(email)
        .execute(&self.pool)
        .await?;

        let row: ProfileRow = sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn update_profile(&self, id: Uuid, patch: &ProfilePatch) -> Result<Option<Profile>, AppError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            UPDATE profiles SET
                company_name = COALESCE($2, company_name),
                brand_color  = COALESCE($3, brand_color),
                accent_color = COALESCE($4, accent_color),
                font         = COALESCE($5, font),
                updated_at   = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.company_name.as_deref())
        .bind(patch.brand_color.as_deref())
        .bind(patch.accent_color.as_deref())
        .bind(patch.font.map(|f| f.as_str()))
        .fetch_optional(&self.pool)
        .await?;
        convert_opt(row)
    }

    async fn record_proposal_created(&self, id: Uuid, month: NaiveDate) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE profiles SET proposal_count = proposal_count + 1, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            INSERT INTO proposal_usage (user_id, month, created)
            VALUES ($1, $2, 1)
            ON CONFLICT (user_id, month) DO UPDATE SET created = proposal_usage.created + 1
            "#,
        )
        .bind(id)
        .bind(month)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn proposals_created_in(&self, id: Uuid, month: NaiveDate) -> Result<i64, AppError> {
        let created: Option<i32> = sqlx::query_scalar(
            "SELECT created FROM proposal_usage WHERE user_id = $1 AND month = $2",
        )
        .bind(id)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;
        Ok(created.map(i64::from).unwrap_or(0))
    }

    async fn set_plan(
        &self,
        id: Uuid,
        plan: Plan,
        stripe_customer_id: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                plan = $2,
                stripe_customer_id = COALESCE($3, stripe_customer_id),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(plan.as_str())
        .bind(stripe_customer_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_plan_by_customer(&self, stripe_customer_id: &str, plan: Plan) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE profiles SET plan = $2, updated_at = now() WHERE stripe_customer_id = $1",
        )
        .bind(stripe_customer_id)
        .bind(plan.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_clients(&self, user_id: Uuid) -> Result<Vec<Client>, AppError> {
        let rows: Vec<ClientRow> =
            sqlx::query_as("SELECT * FROM clients WHERE user_id = $1 ORDER BY name")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Client::from).collect())
    }

    async fn get_client(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        let row: Option<ClientRow> = sqlx::query_as("SELECT * FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Client::from))
    }

    async fn create_client(&self, user_id: Uuid, client: &NewClient) -> Result<Client, AppError> {
        let row: ClientRow = sqlx::query_as(
            r#"
            INSERT INTO clients (user_id, name, company, email, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&client.name)
        .bind(client.company.as_deref())
        .bind(client.email.as_deref())
        .bind(client.notes.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_client(&self, id: Uuid, patch: &ClientPatch) -> Result<Option<Client>, AppError> {
        let row: Option<ClientRow> = sqlx::query_as(
            r#"
            UPDATE clients SET
                name       = COALESCE($2, name),
                company    = COALESCE($3, company),
                email      = COALESCE($4, email),
                notes      = COALESCE($5, notes),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.company.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.notes.as_deref())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Client::from))
    }

    async fn delete_client(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_templates(&self, user_id: Uuid) -> Result<Vec<Template>, AppError> {
        let rows: Vec<TemplateRow> =
            sqlx::query_as("SELECT * FROM templates WHERE user_id = $1 ORDER BY name")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Template::from).collect())
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<Template>, AppError> {
        let row: Option<TemplateRow> = sqlx::query_as("SELECT * FROM templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Template::from))
    }

    async fn create_template(&self, user_id: Uuid, template: &NewTemplate) -> Result<Template, AppError> {
        let row: TemplateRow = sqlx::query_as(
            r#"
            INSERT INTO templates (user_id, name, brand_color, tone, pricing_model, sections)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&template.name)
        .bind(template.brand_color.as_deref())
        .bind(template.tone.as_deref())
        .bind(template.pricing_model.as_str())
        .bind(Json(&template.sections))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete_template(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_proposals(&self, user_id: Uuid) -> Result<Vec<Proposal>, AppError> {
        let rows: Vec<ProposalRow> = sqlx::query_as(
            "SELECT * FROM proposals WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn get_proposal(&self, id: Uuid) -> Result<Option<Proposal>, AppError> {
        let row: Option<ProposalRow> = sqlx::query_as("SELECT * FROM proposals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        convert_opt(row)
    }

    async fn get_proposal_by_share_token(&self, token: &str) -> Result<Option<Proposal>, AppError> {
        let row: Option<ProposalRow> =
            sqlx::query_as("SELECT * FROM proposals WHERE share_token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        convert_opt(row)
    }

    async fn create_proposal(&self, proposal: &NewProposal) -> Result<Proposal, AppError> {
        let row: ProposalRow = sqlx::query_as(
            r#"
            INSERT INTO proposals
                (user_id, client_id, template_id, title, status, content, valid_until)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(proposal.user_id)
        .bind(proposal.client_id)
        .bind(proposal.template_id)
        .bind(&proposal.title)
        .bind(proposal.status.as_str())
        .bind(Json(&proposal.content))
        .bind(proposal.valid_until)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn update_proposal(&self, id: Uuid, patch: &ProposalPatch) -> Result<Option<Proposal>, AppError> {
        let row: Option<ProposalRow> = sqlx::query_as(
            r#"
            UPDATE proposals SET
                title       = COALESCE($2, title),
                content     = COALESCE($3, content),
                client_id   = CASE WHEN $4 THEN $5 ELSE client_id END,
                template_id = CASE WHEN $6 THEN $7 ELSE template_id END,
                valid_until = CASE WHEN $8 THEN $9 ELSE valid_until END,
                updated_at  = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(patch.content.as_ref().map(Json))
        .bind(patch.client_id.is_some())
        .bind(patch.client_id.flatten())
        .bind(patch.template_id.is_some())
        .bind(patch.template_id.flatten())
        .bind(patch.valid_until.is_some())
        .bind(patch.valid_until.flatten())
        .fetch_optional(&self.pool)
        .await?;
        convert_opt(row)
    }

    async fn set_content(
        &self,
        id: Uuid,
        content: &ProposalContent,
        status: ProposalStatus,
    ) -> Result<Option<Proposal>, AppError> {
        let row: Option<ProposalRow> = sqlx::query_as(
            r#"
            UPDATE proposals SET content = $2, status = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(content))
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        convert_opt(row)
    }

    async fn set_status(&self, id: Uuid, status: ProposalStatus) -> Result<Option<Proposal>, AppError> {
        let row: Option<ProposalRow> = sqlx::query_as(
            "UPDATE proposals SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        convert_opt(row)
    }

    async fn set_sharing(
        &self,
        id: Uuid,
        enabled: bool,
        token: Option<&str>,
    ) -> Result<Option<Proposal>, AppError> {
        let row: Option<ProposalRow> = sqlx::query_as(
            r#"
            UPDATE proposals SET
                share_enabled = $2,
                share_token   = COALESCE($3, share_token),
                updated_at    = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(enabled)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        convert_opt(row)
    }

    async fn delete_proposal(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM proposals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_activity(&self, entry: &NewActivity) -> Result<ActivityEntry, AppError> {
        let row: ActivityRow = sqlx::query_as(
            r#"
            INSERT INTO activity_log (proposal_id, actor_id, action, details)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(entry.proposal_id)
        .bind(entry.actor_id)
        .bind(entry.action.as_str())
        .bind(&entry.details)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn list_activity(&self, proposal_id: Uuid) -> Result<Vec<ActivityEntry>, AppError> {
        let rows: Vec<ActivityRow> = sqlx::query_as(
            "SELECT * FROM activity_log WHERE proposal_id = $1 ORDER BY created_at, id",
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }
}
