pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::billing::handlers as billing;
use crate::clients::handlers as clients;
use crate::generation::handlers as generation;
use crate::profile::handlers as profile;
use crate::proposals::handlers as proposals;
use crate::share::handlers as share;
use crate::state::AppState;
use crate::templates::handlers as templates;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Account
        .route(
            "/api/profile",
            get(profile::handle_get).patch(profile::handle_update),
        )
        .route("/api/plans", get(billing::handle_list_plans))
        // Clients
        .route(
            "/api/clients",
            get(clients::handle_list).post(clients::handle_create),
        )
        .route(
            "/api/clients/:id",
            get(clients::handle_get)
                .patch(clients::handle_update)
                .delete(clients::handle_delete),
        )
        // Templates
        .route(
            "/api/templates",
            get(templates::handle_list).post(templates::handle_create),
        )
        .route(
            "/api/templates/:id",
            get(templates::handle_get).delete(templates::handle_delete),
        )
        // Proposals
        .route("/api/proposals", get(proposals::handle_list))
        .route(
            "/api/proposals/generate",
            post(generation::handle_generate),
        )
        .route(
            "/api/proposals/:id",
            get(proposals::handle_get)
                .patch(proposals::handle_update)
                .delete(proposals::handle_delete),
        )
        .route(
            "/api/proposals/:id/status",
            post(proposals::handle_set_status),
        )
        .route("/api/proposals/:id/share", post(proposals::handle_share))
        .route(
            "/api/proposals/:id/activity",
            get(proposals::handle_activity),
        )
        .route("/api/proposals/:id/pdf", get(proposals::handle_pdf))
        // Public share links
        .route("/api/share/:token", get(share::handle_view))
        .route("/api/share/:token/respond", post(share::handle_respond))
        // Billing provider callbacks
        .route("/api/webhooks/:provider", post(billing::handle_webhook))
        .with_state(state)
}
