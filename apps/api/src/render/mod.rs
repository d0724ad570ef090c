// Render: proposal → branded PDF. `document` composes pages, `pdf` writes them.

pub mod document;
pub mod pdf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::errors::AppError;
use crate::layout::{Layout, PageConfig};
use crate::models::profile::Branding;
use crate::models::proposal::Proposal;

use document::{compose, RenderInput};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF serialization failed: {0}")]
    Pdf(String),

    #[error("render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<RenderError> for AppError {
    fn from(e: RenderError) -> Self {
        AppError::Render(e.to_string())
    }
}

/// Owned inputs for one render, so the work can move onto a blocking thread.
pub struct RenderJob {
    pub proposal: Proposal,
    pub client_name: Option<String>,
    pub branding: Branding,
    pub layout: Layout,
    pub issued_on: NaiveDate,
    pub page_config: PageConfig,
}

impl RenderJob {
    pub fn render(&self) -> Result<Vec<u8>, RenderError> {
        let input = RenderInput {
            proposal: &self.proposal,
            client_name: self.client_name.as_deref(),
            branding: &self.branding,
            layout: &self.layout,
            issued_on: self.issued_on,
        };
        let document = compose(&input, &self.page_config);
        tracing::debug!(
            "Composed proposal {} into {} page(s)",
            self.proposal.id,
            document.pages.len()
        );
        pdf::write_pdf(&document)
    }
}

/// Renders on the blocking pool; PDF assembly is CPU-bound.
pub async fn render_pdf(job: RenderJob) -> Result<Vec<u8>, RenderError> {
    tokio::task::spawn_blocking(move || job.render()).await?
}

/// `Brand Refresh: Phase 2!` → `brand-refresh-phase-2.pdf`.
pub fn pdf_filename(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "proposal.pdf".to_string()
    } else {
        format!("{slug}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::default_page_config;
    use crate::models::proposal::{ProposalContent, ProposalStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn job(summary: &str) -> RenderJob {
        let mut content = ProposalContent::default();
        content.summary = summary.to_string();
        RenderJob {
            proposal: Proposal {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                client_id: None,
                template_id: None,
                title: "Website Redesign".to_string(),
                status: ProposalStatus::Draft,
                content,
                share_token: None,
                share_enabled: false,
                valid_until: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            client_name: Some("Globex".to_string()),
            branding: Branding::default(),
            layout: Layout::default_sections(),
            issued_on: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            page_config: default_page_config(),
        }
    }

    #[test]
    fn test_pdf_filename() {
        assert_eq!(pdf_filename("Brand Refresh: Phase 2!"), "brand-refresh-phase-2.pdf");
        assert_eq!(pdf_filename("  Q3   Retainer  "), "q3-retainer.pdf");
        assert_eq!(pdf_filename("!!!"), "proposal.pdf");
        assert_eq!(pdf_filename(""), "proposal.pdf");
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let bytes = job("A short summary.").render().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[tokio::test]
    async fn test_render_pdf_on_blocking_pool() {
        let bytes = render_pdf(job(&"Long form body copy. ".repeat(400)))
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
