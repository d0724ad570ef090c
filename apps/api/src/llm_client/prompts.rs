// Cross-cutting prompt fragments. Feature modules keep their own prompts.rs.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps drafted copy honest about what the brief actually states.
pub const FACTUALITY_INSTRUCTION: &str = "\
    Only state facts, figures, dates and deliverables that appear in the brief. \
    Where the brief is silent, write neutral placeholder language such as \
    \"to be confirmed\" instead of inventing specifics.";
