mod auth;
mod billing;
mod clients;
mod config;
mod db;
mod errors;
mod generation;
mod layout;
mod llm_client;
mod models;
mod profile;
mod proposals;
mod render;
mod routes;
mod share;
mod state;
mod store;
mod templates;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::SupabaseAuth;
use crate::config::Config;
use crate::db::create_pool;
use crate::layout::default_page_config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Fails only on DATABASE_URL / PORT; integration keys are optional
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting proposals API v{}", env!("CARGO_PKG_VERSION"));
    config.warn_missing();

    let pool = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(pool));

    let auth = SupabaseAuth::new(config.supabase_url.clone(), config.supabase_anon_key.clone())
        .context("failed to build identity provider client")?;

    let llm = LlmClient::new(config.anthropic_api_key.clone())
        .context("failed to build LLM client")?;
    info!(
        "LLM client initialized (models: {} / {})",
        llm_client::FAST_MODEL,
        llm_client::THINKING_MODEL
    );

    let page_config = default_page_config();
    info!(
        "PDF page {}x{}mm, body {}pt",
        page_config.page_width_mm, page_config.page_height_mm, page_config.body_size_pt
    );

    let state = AppState {
        store,
        auth: Arc::new(auth),
        llm,
        config: config.clone(),
        page_config,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
