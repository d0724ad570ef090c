use anyhow::{Context, Result};
use tracing::warn;

const DEFAULT_APP_URL: &str = "http://localhost:3000";

/// Application configuration loaded from environment variables.
///
/// Only `DATABASE_URL` is required. Integration keys may be absent at startup;
/// `warn_missing` logs each one so a misconfigured deployment is visible
/// without refusing to boot.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub app_url: String,
    pub stripe_webhook_secret: Option<String>,
    pub port: u16,
    pub rust_log: String,
    missing: Vec<&'static str>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let mut missing = Vec::new();
        let mut optional = |key: &'static str| match std::env::var(key) {
            Ok(v) if !v.trim().is_empty() => Some(v),
            _ => {
                missing.push(key);
                None
            }
        };

        let supabase_url = optional("SUPABASE_URL");
        let supabase_anon_key = optional("SUPABASE_ANON_KEY");
        let anthropic_api_key = optional("ANTHROPIC_API_KEY");
        let app_url = optional("APP_URL").unwrap_or_else(|| DEFAULT_APP_URL.to_string());
        let stripe_webhook_secret = optional("STRIPE_WEBHOOK_SECRET");

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            supabase_url,
            supabase_anon_key,
            anthropic_api_key,
            app_url,
            stripe_webhook_secret,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            missing,
        })
    }

    /// Logs one warning per missing optional variable. Call after tracing is initialized.
    pub fn warn_missing(&self) {
        for key in &self.missing {
            warn!("Environment variable '{key}' is not set; dependent features will fail at request time");
        }
    }

    /// Public link a client opens to view a shared proposal.
    pub fn share_url(&self, token: &str) -> String {
        format!("{}/share/{token}", self.app_url.trim_end_matches('/'))
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
impl Config {
    /// Fully populated config for router tests. Never touches the environment.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/proposals_test".to_string(),
            supabase_url: Some("http://localhost:54321".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            anthropic_api_key: Some("test-key".to_string()),
            app_url: "https://app.example.com/".to_string(),
            stripe_webhook_secret: Some("whsec_test".to_string()),
            port: 8080,
            rust_log: "debug".to_string(),
            missing: Vec::new(),
        }
    }
}
