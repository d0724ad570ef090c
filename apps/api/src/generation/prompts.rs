// Prompt construction for proposal drafting.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::layout::SectionId;
use crate::llm_client::prompts::{FACTUALITY_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::models::client::Client;
use crate::models::proposal::PricingModel;
use crate::models::template::Template;

const DRAFT_ROLE: &str = "You are an experienced agency strategist who writes \
    clear, persuasive client proposals. Write in plain business English, \
    address the client directly, and keep each section focused.";

/// Output schema. Replace `{sections}` and `{pricing_model}` before sending.
const DRAFT_SCHEMA_TEMPLATE: &str = r#"Return a JSON object with this EXACT schema (no extra fields):
{
  "title": "Short proposal title",
  "summary": "Two or three sentence executive summary",
  "sections": [
    {"section": "problem", "heading": "Section heading", "body": "Section text. Paragraphs separated by blank lines."}
  ],
  "pricing": {
    "model": "{pricing_model}",
    "currency": "USD",
    "items": [
      {"description": "Line item", "quantity": 1, "unit_price_cents": 250000}
    ],
    "notes": "Payment terms or assumptions"
  }
}

Write one entry in "sections" for each of these section ids, in this order: {sections}.
Amounts are integers in cents. Use the "{pricing_model}" pricing model."#;

/// System prompt: role, tone, company voice, then the JSON-only constraint.
pub fn build_system_prompt(template: Option<&Template>, company_name: Option<&str>) -> String {
    let mut system = String::from(DRAFT_ROLE);

    if let Some(company) = company_name.filter(|c| !c.trim().is_empty()) {
        system.push_str(&format!(" You are writing on behalf of {company}."));
    }
    if let Some(tone) = template
        .and_then(|t| t.tone.as_deref())
        .filter(|t| !t.trim().is_empty())
    {
        system.push_str(&format!(" Tone guidance: {tone}."));
    }

    system.push(' ');
    system.push_str(FACTUALITY_INSTRUCTION);
    system.push(' ');
    system.push_str(JSON_ONLY_SYSTEM);
    system
}

/// Sections the model writes prose for. Cover, summary and pricing come from
/// dedicated fields.
pub fn prose_sections(sections: &[SectionId]) -> Vec<SectionId> {
    sections
        .iter()
        .copied()
        .filter(|s| !matches!(s, SectionId::Cover | SectionId::Summary | SectionId::Pricing))
        .collect()
}

pub fn build_user_prompt(
    brief: &str,
    client: Option<&Client>,
    sections: &[SectionId],
    pricing_model: PricingModel,
) -> String {
    let section_list = prose_sections(sections)
        .iter()
        .map(|s| format!("\"{}\"", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = DRAFT_SCHEMA_TEMPLATE
        .replace("{sections}", &section_list)
        .replace("{pricing_model}", pricing_model.as_str());

    if let Some(client) = client {
        prompt.push_str("\n\nCLIENT:\n");
        prompt.push_str(&format!("Name: {}\n", client.name));
        if let Some(company) = &client.company {
            prompt.push_str(&format!("Company: {company}\n"));
        }
        if let Some(notes) = client.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            prompt.push_str(&format!("Notes: {notes}\n"));
        }
    }

    prompt.push_str("\n\nBRIEF:\n");
    prompt.push_str(brief.trim());
    prompt
}
