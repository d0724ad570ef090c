//! In-memory `Store` for router tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::billing::plans::Plan;
use crate::errors::AppError;
use crate::models::activity::{ActivityEntry, NewActivity};
use crate::models::client::{Client, ClientPatch, NewClient};
use crate::models::profile::{Profile, ProfilePatch};
use crate::models::proposal::{NewProposal, Proposal, ProposalContent, ProposalPatch, ProposalStatus};
use crate::models::template::{NewTemplate, Template};
use crate::store::Store;

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    clients: HashMap<Uuid, Client>,
    templates: HashMap<Uuid, Template>,
    proposals: HashMap<Uuid, Proposal>,
    activity: Vec<ActivityEntry>,
    usage: HashMap<(Uuid, NaiveDate), i64>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut tables = self.tables.lock().unwrap();
        f(&mut tables)
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.with(|t| t.profiles.insert(profile.id, profile));
    }

    pub fn insert_proposal(&self, proposal: Proposal) {
        self.with(|t| t.proposals.insert(proposal.id, proposal));
    }

    /// Counts a seeded proposal against `user_id`'s monthly usage.
    pub fn record_usage(&self, user_id: Uuid, month: NaiveDate) {
        self.with(|t| *t.usage.entry((user_id, month)).or_default() += 1);
    }

    pub fn activity_count(&self, proposal_id: Uuid) -> usize {
        self.with(|t| t.activity.iter().filter(|a| a.proposal_id == proposal_id).count())
    }
}

pub fn blank_profile(id: Uuid, plan: Plan) -> Profile {
    let now = Utc::now();
    Profile {
        id,
        email: None,
        plan,
        proposal_count: 0,
        company_name: None,
        brand_color: None,
        accent_color: None,
        font: Default::default(),
        stripe_customer_id: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        Ok(self.with(|t| t.profiles.get(&id).cloned()))
    }

    async fn ensure_profile(&self, id: Uuid, email: Option<&str>) -> Result<Profile, AppError> {
        Ok(self.with(|t| {
            t.profiles
                .entry(id)
                .or_insert_with(|| Profile {
                    email: email.map(str::to_owned),
                    ..blank_profile(id, Plan::Free)
                })
                .clone()
        }))
    }

    async fn update_profile(&self, id: Uuid, patch: &ProfilePatch) -> Result<Option<Profile>, AppError> {
        Ok(self.with(|t| {
            t.profiles.get_mut(&id).map(|p| {
                if let Some(v) = &patch.company_name {
                    p.company_name = Some(v.clone());
                }
                if let Some(v) = &patch.brand_color {
                    p.brand_color = Some(v.clone());
                }
                if let Some(v) = &patch.accent_color {
                    p.accent_color = Some(v.clone());
                }
                if let Some(font) = patch.font {
                    p.font = font;
                }
                p.updated_at = Utc::now();
                p.clone()
            })
        }))
    }

    async fn record_proposal_created(&self, id: Uuid, month: NaiveDate) -> Result<(), AppError> {
        self.with(|t| {
            if let Some(p) = t.profiles.get_mut(&id) {
                p.proposal_count += 1;
            }
            *t.usage.entry((id, month)).or_default() += 1;
        });
        Ok(())
    }

    async fn proposals_created_in(&self, id: Uuid, month: NaiveDate) -> Result<i64, AppError> {
        Ok(self.with(|t| t.usage.get(&(id, month)).copied().unwrap_or(0)))
    }

    async fn set_plan(
        &self,
        id: Uuid,
        plan: Plan,
        stripe_customer_id: Option<&str>,
    ) -> Result<bool, AppError> {
        Ok(self.with(|t| match t.profiles.get_mut(&id) {
            Some(p) => {
                p.plan = plan;
                if let Some(customer) = stripe_customer_id {
                    p.stripe_customer_id = Some(customer.to_string());
                }
                true
            }
            None => false,
        }))
    }

    async fn set_plan_by_customer(&self, stripe_customer_id: &str, plan: Plan) -> Result<bool, AppError> {
        Ok(self.with(|t| {
            let mut found = false;
            for p in t.profiles.values_mut() {
                if p.stripe_customer_id.as_deref() == Some(stripe_customer_id) {
                    p.plan = plan;
                    found = true;
                }
            }
            found
        }))
    }

    async fn list_clients(&self, user_id: Uuid) -> Result<Vec<Client>, AppError> {
        Ok(self.with(|t| {
            let mut clients: Vec<Client> = t
                .clients
                .values()
                .filter(|c| c.user_id == user_id)
                .cloned()
                .collect();
            clients.sort_by(|a, b| a.name.cmp(&b.name));
            clients
        }))
    }

    async fn get_client(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.with(|t| t.clients.get(&id).cloned()))
    }

    async fn create_client(&self, user_id: Uuid, client: &NewClient) -> Result<Client, AppError> {
        let now = Utc::now();
        let row = Client {
            id: Uuid::new_v4(),
            user_id,
            name: client.name.clone(),
            company: client.company.clone(),
            email: client.email.clone(),
            notes: client.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        self.with(|t| t.clients.insert(row.id, row.clone()));
        Ok(row)
    }

    async fn update_client(&self, id: Uuid, patch: &ClientPatch) -> Result<Option<Client>, AppError> {
        Ok(self.with(|t| {
            t.clients.get_mut(&id).map(|c| {
                if let Some(v) = &patch.name {
                    c.name = v.clone();
                }
                if let Some(v) = &patch.company {
                    c.company = Some(v.clone());
                }
                if let Some(v) = &patch.email {
                    c.email = Some(v.clone());
                }
                if let Some(v) = &patch.notes {
                    c.notes = Some(v.clone());
                }
                c.updated_at = Utc::now();
                c.clone()
            })
        }))
    }

    async fn delete_client(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.with(|t| t.clients.remove(&id).is_some()))
    }

    async fn list_templates(&self, user_id: Uuid) -> Result<Vec<Template>, AppError> {
        Ok(self.with(|t| {
            t.templates
                .values()
                .filter(|tpl| tpl.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<Template>, AppError> {
        Ok(self.with(|t| t.templates.get(&id).cloned()))
    }

    async fn create_template(&self, user_id: Uuid, template: &NewTemplate) -> Result<Template, AppError> {
        let now = Utc::now();
        let row = Template {
            id: Uuid::new_v4(),
            user_id,
            name: template.name.clone(),
            brand_color: template.brand_color.clone(),
            tone: template.tone.clone(),
            pricing_model: template.pricing_model,
            sections: template.sections.clone(),
            created_at: now,
            updated_at: now,
        };
        self.with(|t| t.templates.insert(row.id, row.clone()));
        Ok(row)
    }

    async fn delete_template(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.with(|t| t.templates.remove(&id).is_some()))
    }

    async fn list_proposals(&self, user_id: Uuid) -> Result<Vec<Proposal>, AppError> {
        Ok(self.with(|t| {
            let mut proposals: Vec<Proposal> = t
                .proposals
                .values()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect();
            proposals.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            proposals
        }))
    }

    async fn get_proposal(&self, id: Uuid) -> Result<Option<Proposal>, AppError> {
        Ok(self.with(|t| t.proposals.get(&id).cloned()))
    }

    async fn get_proposal_by_share_token(&self, token: &str) -> Result<Option<Proposal>, AppError> {
        Ok(self.with(|t| {
            t.proposals
                .values()
                .find(|p| p.share_token.as_deref() == Some(token))
                .cloned()
        }))
    }

    async fn create_proposal(&self, proposal: &NewProposal) -> Result<Proposal, AppError> {
        let now = Utc::now();
        let row = Proposal {
            id: Uuid::new_v4(),
            user_id: proposal.user_id,
            client_id: proposal.client_id,
            template_id: proposal.template_id,
            title: proposal.title.clone(),
            status: proposal.status,
            content: proposal.content.clone(),
            share_token: None,
            share_enabled: false,
            valid_until: proposal.valid_until,
            created_at: now,
            updated_at: now,
        };
        self.with(|t| t.proposals.insert(row.id, row.clone()));
        Ok(row)
    }

    async fn update_proposal(&self, id: Uuid, patch: &ProposalPatch) -> Result<Option<Proposal>, AppError> {
        Ok(self.with(|t| {
            t.proposals.get_mut(&id).map(|p| {
                if let Some(v) = &patch.title {
                    p.title = v.clone();
                }
                if let Some(v) = &patch.content {
                    p.content = v.clone();
                }
                if let Some(v) = patch.client_id {
                    p.client_id = v;
                }
                if let Some(v) = patch.template_id {
                    p.template_id = v;
                }
                if let Some(v) = patch.valid_until {
                    p.valid_until = v;
                }
                p.updated_at = Utc::now();
                p.clone()
            })
        }))
    }

    async fn set_content(
        &self,
        id: Uuid,
        content: &ProposalContent,
        status: ProposalStatus,
    ) -> Result<Option<Proposal>, AppError> {
        Ok(self.with(|t| {
            t.proposals.get_mut(&id).map(|p| {
                p.content = content.clone();
                p.status = status;
                p.updated_at = Utc::now();
                p.clone()
            })
        }))
    }

    async fn set_status(&self, id: Uuid, status: ProposalStatus) -> Result<Option<Proposal>, AppError> {
        Ok(self.with(|t| {
            t.proposals.get_mut(&id).map(|p| {
                p.status = status;
                p.updated_at = Utc::now();
                p.clone()
            })
        }))
    }

    async fn set_sharing(
        &self,
        id: Uuid,
        enabled: bool,
        token: Option<&str>,
    ) -> Result<Option<Proposal>, AppError> {
        Ok(self.with(|t| {
            t.proposals.get_mut(&id).map(|p| {
                p.share_enabled = enabled;
                if let Some(token) = token {
                    p.share_token = Some(token.to_string());
                }
                p.updated_at = Utc::now();
                p.clone()
            })
        }))
    }

    async fn delete_proposal(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.with(|t| {
            t.activity.retain(|a| a.proposal_id != id);
            t.proposals.remove(&id).is_some()
        }))
    }

    async fn append_activity(&self, entry: &NewActivity) -> Result<ActivityEntry, AppError> {
        let row = ActivityEntry {
            id: Uuid::new_v4(),
            proposal_id: entry.proposal_id,
            actor_id: entry.actor_id,
            action: entry.action,
            details: entry.details.clone(),
            created_at: Utc::now(),
        };
        self.with(|t| t.activity.push(row.clone()));
        Ok(row)
    }

    async fn list_activity(&self, proposal_id: Uuid) -> Result<Vec<ActivityEntry>, AppError> {
        Ok(self.with(|t| {
            t.activity
                .iter()
                .filter(|a| a.proposal_id == proposal_id)
                .cloned()
                .collect()
        }))
    }
}
