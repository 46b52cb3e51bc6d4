#![allow(dead_code)]

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`

use puzzle_bff::{
    build_router,
    stats::clock::FixedClock,
    stores::{
        BackendClient, HttpActiveGameStore, HttpPuzzleStore, HttpStatisticsStore,
        InMemoryActiveGameStore, InMemoryPuzzleStore, InMemoryStatisticsStore,
    },
    AppState, AuthContext, TokenConfig,
};

pub const TEST_SECRET: &str = "integration-secret";
pub const TEST_SUBJECT: &str = "auth0|integration";
pub const TEST_USER_ID: &str = "auth0-integration";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 23).unwrap()
}

/// One token per test binary, so mocks matching on the header see the same value
pub fn bearer_token() -> String {
    static TOKEN: OnceLock<String> = OnceLock::new();
    TOKEN
        .get_or_init(|| {
            let token = TokenConfig::new(TEST_SECRET)
                .create_token(TEST_SUBJECT, chrono::Duration::hours(1))
                .unwrap();
            format!("Bearer {token}")
        })
        .clone()
}

pub fn auth_context() -> AuthContext {
    AuthContext {
        user_id: TEST_USER_ID.to_string(),
        authorization: bearer_token(),
    }
}

// ============================================================================
// In-memory router setup
// ============================================================================

pub struct TestSetup {
    pub active_games: Arc<InMemoryActiveGameStore>,
    pub statistics: Arc<InMemoryStatisticsStore>,
    pub router: Router,
}

impl TestSetup {
    pub fn new() -> Self {
        let active_games = Arc::new(InMemoryActiveGameStore::new());
        let statistics = Arc::new(InMemoryStatisticsStore::new());
        let state = AppState::new(
            active_games.clone(),
            statistics.clone(),
            Arc::new(InMemoryPuzzleStore::with_sample_puzzles()),
            Arc::new(FixedClock::new(today())),
            TokenConfig::new(TEST_SECRET),
        );

        Self {
            active_games,
            statistics,
            router: build_router(state),
        }
    }

    /// Sends an authenticated request and returns the status and JSON body
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(self.router.clone(), method, uri, body).await
    }
}

pub async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", bearer_token());

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

// ============================================================================
// HTTP store setup against one mock backend
// ============================================================================

/// Router whose three stores all point at `base_url`
pub fn http_router(base_url: &str, timeout: Duration) -> Router {
    let client = || BackendClient::new(base_url, timeout).unwrap();
    let state = AppState::new(
        Arc::new(HttpActiveGameStore::new(client())),
        Arc::new(HttpStatisticsStore::new(client())),
        Arc::new(HttpPuzzleStore::new(client())),
        Arc::new(FixedClock::new(today())),
        TokenConfig::new(TEST_SECRET),
    );
    build_router(state)
}
