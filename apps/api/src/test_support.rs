//! Router-level test harness: in-memory store, static tokens, no network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::{Identity, StaticAuth};
use crate::billing::plans::Plan;
use crate::config::Config;
use crate::generation::generator::usage_month;
use crate::layout::{default_page_config, SectionId};
use crate::llm_client::LlmClient;
use crate::models::proposal::{
    ContentSection, LineItem, Pricing, PricingModel, Proposal, ProposalContent, ProposalStatus,
};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::memory::{blank_profile, MemoryStore};

pub const OWNER_TOKEN: &str = "owner-token";
pub const STRANGER_TOKEN: &str = "stranger-token";

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub owner: Uuid,
    pub stranger: Uuid,
    router: Router,
}

impl TestApp {
    /// Owner and stranger both have free-plan profiles. Drafting fails with a
    /// missing API key.
    pub fn new() -> Self {
        Self::with_llm(LlmClient::new(None).unwrap())
    }

    pub fn with_llm(llm: LlmClient) -> Self {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        store.insert_profile(blank_profile(owner, Plan::Free));
        store.insert_profile(blank_profile(stranger, Plan::Free));

        let tokens = HashMap::from([
            (
                OWNER_TOKEN.to_string(),
                Identity {
                    user_id: owner,
                    email: Some("owner@example.com".to_string()),
                },
            ),
            (
                STRANGER_TOKEN.to_string(),
                Identity {
                    user_id: stranger,
                    email: None,
                },
            ),
        ]);

        let state = AppState {
            store: store.clone(),
            auth: Arc::new(StaticAuth { tokens }),
            llm,
            config: Config::for_tests(),
            page_config: default_page_config(),
        };

        Self {
            store,
            owner,
            stranger,
            router: build_router(state),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    /// JSON request; the response body is parsed as JSON (`Null` when empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, _, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub fn seed_proposal(&self, status: ProposalStatus) -> Proposal {
        let proposal = sample_proposal(self.owner, status);
        self.store.insert_proposal(proposal.clone());
        self.store.record_usage(self.owner, usage_month(proposal.created_at));
        proposal
    }

    /// A shared proposal; returns it with its token set.
    pub fn seed_shared(&self, status: ProposalStatus) -> Proposal {
        let mut proposal = sample_proposal(self.owner, status);
        proposal.share_enabled = true;
        proposal.share_token = Some(format!("tok{}", proposal.id.simple()));
        self.store.insert_proposal(proposal.clone());
        self.store.record_usage(self.owner, usage_month(proposal.created_at));
        proposal
    }
}

pub fn sample_proposal(owner: Uuid, status: ProposalStatus) -> Proposal {
    let now = Utc::now();
    Proposal {
        id: Uuid::new_v4(),
        user_id: owner,
        client_id: None,
        template_id: None,
        title: "Mobile App Discovery Sprint".to_string(),
        status,
        content: ProposalContent {
            summary: "A two-week discovery sprint to scope the mobile app.".to_string(),
            sections: vec![ContentSection {
                section: SectionId::Deliverables,
                heading: "What you get".to_string(),
                body: "Research report\n\nClickable prototype".to_string(),
            }],
            pricing: Pricing {
                model: PricingModel::Fixed,
                currency: "USD".to_string(),
                items: vec![LineItem {
                    description: "Discovery sprint".to_string(),
                    quantity: 1.0,
                    unit_price_cents: 1_200_000,
                }],
                notes: None,
            },
        },
        share_token: None,
        share_enabled: false,
        valid_until: Some(now + Duration::days(30)),
        created_at: now,
        updated_at: now,
    }
}

/// Local stand-in for the Anthropic Messages API.
pub struct MessagesApi {
    pub url: String,
    /// Request bodies in arrival order.
    pub requests: Arc<Mutex<Vec<Value>>>,
}

impl MessagesApi {
    /// Serves `replies` in order; the last one repeats.
    pub async fn start(replies: Vec<(StatusCode, Value)>) -> Self {
        let requests: Arc<Mutex<Vec<Value>>> = Arc::default();
        let replies = Arc::new(replies);
        let seen = requests.clone();
        let app = Router::new().route(
            "/v1/messages",
            post(move |Json(body): Json<Value>| {
                let seen = seen.clone();
                let replies = replies.clone();
                async move {
                    let mut log = seen.lock().unwrap();
                    log.push(body);
                    let (status, reply) = replies[(log.len() - 1).min(replies.len() - 1)].clone();
                    (status, Json(reply))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Self {
            url: format!("http://{addr}/v1/messages"),
            requests,
        }
    }

    pub async fn replying(text: &str) -> Self {
        Self::start(vec![(StatusCode::OK, messages_reply(text))]).await
    }

    pub fn client(&self) -> LlmClient {
        LlmClient::with_api_url("test-key", self.url.clone()).unwrap()
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

/// A thinking block followed by the answer, as extended thinking returns it.
pub fn messages_reply(text: &str) -> Value {
    json!({
        "content": [
            {"type": "thinking", "thinking": "Scoping the engagement first."},
            {"type": "text", "text": text}
        ],
        "usage": {"input_tokens": 320, "output_tokens": 910}
    })
}

/// Model output for a small fixed-price proposal, wrapped in a code fence.
pub fn drafted_json() -> String {
    let draft = json!({
        "title": "Checkout Redesign",
        "summary": "We redesign checkout to cut drop-off.",
        "sections": [
            {"section": "problem", "heading": "", "body": "Half of carts are abandoned."},
            {"section": "solution", "heading": "Our approach", "body": "Two-step checkout."}
        ],
        "pricing": {"model": "hourly", "currency": "", "items": [
            {"description": "Design", "quantity": 1, "unit_price_cents": 800000},
            {"description": "Build", "quantity": 2, "unit_price_cents": 450000}
        ]}
    });
    format!("```json\n{draft}\n```")
}
