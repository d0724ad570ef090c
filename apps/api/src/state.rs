use std::sync::Arc;

use crate::auth::AuthProvider;
use crate::config::Config;
use crate::layout::PageConfig;
use crate::llm_client::LlmClient;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: Arc<dyn AuthProvider>,
    /// Explicitly constructed in `main`; there is no global client.
    pub llm: LlmClient,
    pub config: Config,
    /// Page geometry and type sizes for PDF rendering.
    pub page_config: PageConfig,
}
