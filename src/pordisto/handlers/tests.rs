//! Handler-level scenarios for the login gate and admin verification.

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::extract::Extension;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use super::{login, verify_admin};
use crate::pordisto::provider::{Claims, IdentityProvider, ProviderError, Role, Session};
use crate::pordisto::rate_limit::{
    AttemptKey, CounterError, CounterStore, MemoryCounterStore, WindowSnapshot,
};
use crate::pordisto::state::{GateConfig, GateState};
use crate::pordisto::types::LoginRequest;

#[derive(Clone, Copy, Debug)]
pub(crate) enum SignInBehavior {
    Succeed,
    Reject,
    Outage,
}

#[derive(Clone, Copy, Debug)]
enum ValidateBehavior {
    Valid(Uuid),
    Invalid,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum RoleBehavior {
    Admin,
    Staff,
    Error,
}

pub(crate) struct MockProvider {
    script: Mutex<VecDeque<SignInBehavior>>,
    fallback: SignInBehavior,
    sign_in_calls: AtomicUsize,
    validate: ValidateBehavior,
    role: RoleBehavior,
}

impl MockProvider {
    pub(crate) fn always(behavior: SignInBehavior) -> Arc<Self> {
        Self::build(Vec::new(), behavior, ValidateBehavior::Invalid, RoleBehavior::Staff)
    }

    pub(crate) fn scripted(script: Vec<SignInBehavior>, fallback: SignInBehavior) -> Arc<Self> {
        Self::build(script, fallback, ValidateBehavior::Invalid, RoleBehavior::Staff)
    }

    pub(crate) fn with_token(user_id: Uuid, role: RoleBehavior) -> Arc<Self> {
        Self::build(
            Vec::new(),
            SignInBehavior::Reject,
            ValidateBehavior::Valid(user_id),
            role,
        )
    }

    pub(crate) fn invalid_token() -> Arc<Self> {
        Self::build(
            Vec::new(),
            SignInBehavior::Reject,
            ValidateBehavior::Invalid,
            RoleBehavior::Staff,
        )
    }

    fn build(
        script: Vec<SignInBehavior>,
        fallback: SignInBehavior,
        validate: ValidateBehavior,
        role: RoleBehavior,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            sign_in_calls: AtomicUsize::new(0),
            validate,
            role,
        })
    }

    pub(crate) fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }
}

fn session() -> Session {
    Session {
        access_token: "jwt".to_string(),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        refresh_token: "refresh".to_string(),
        user: serde_json::json!({ "id": "8a1e7c8e-54ab-4a2f-9255-3c3ff1a7a1f0" }),
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> Result<Session, ProviderError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        match behavior {
            SignInBehavior::Succeed => Ok(session()),
            SignInBehavior::Reject => Err(ProviderError::InvalidCredentials),
            SignInBehavior::Outage => Err(ProviderError::Unavailable(
                "auth backend returned 500".to_string(),
            )),
        }
    }

    async fn validate_token(&self, _token: &str) -> Result<Claims, ProviderError> {
        match self.validate {
            ValidateBehavior::Valid(sub) => Ok(Claims { sub, email: None }),
            ValidateBehavior::Invalid => Err(ProviderError::InvalidToken),
        }
    }

    async fn has_role(&self, _user_id: Uuid, role: Role) -> Result<bool, ProviderError> {
        match self.role {
            RoleBehavior::Admin => Ok(role == Role::Admin),
            RoleBehavior::Staff => Ok(false),
            RoleBehavior::Error => Err(ProviderError::Unavailable(
                "role check returned 500".to_string(),
            )),
        }
    }
}

/// Counter store that is always down. Logins must fail closed against it.
pub(crate) struct FailingCounterStore;

#[async_trait]
impl CounterStore for FailingCounterStore {
    async fn increment(
        &self,
        _key: &AttemptKey,
        _window: Duration,
    ) -> Result<WindowSnapshot, CounterError> {
        Err(CounterError::Unavailable("connection refused".to_string()))
    }

    async fn clear(&self, _key: &AttemptKey) -> Result<(), CounterError> {
        Err(CounterError::Unavailable("connection refused".to_string()))
    }
}

pub(crate) fn gate_state(
    provider: Arc<MockProvider>,
    limit: i64,
    window_secs: u64,
) -> Arc<GateState> {
    gate_state_with(Arc::new(MemoryCounterStore::new()), provider, limit, window_secs)
}

pub(crate) fn gate_state_with(
    counters: Arc<dyn CounterStore>,
    provider: Arc<MockProvider>,
    limit: i64,
    window_secs: u64,
) -> Arc<GateState> {
    let config = GateConfig::new(vec![
        "https://stellina-ristorante.de".to_string(),
        "http://localhost:5173".to_string(),
    ])
    .with_attempt_limit(limit)
    .with_window_seconds(window_secs);

    Arc::new(GateState::new(config, counters, provider))
}

async fn post_login(state: &Arc<GateState>, email: &str, password: &str, ip: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_str(ip).unwrap());
    login(
        headers,
        Extension(state.clone()),
        Some(Json(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })),
    )
    .await
}

async fn post_verify(state: &Arc<GateState>, authorization: Option<&str>) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(value) = authorization {
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    }
    verify_admin(headers, Extension(state.clone())).await
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn attempts_under_the_limit_reach_the_provider() {
    let provider = MockProvider::always(SignInBehavior::Reject);
    let state = gate_state(provider.clone(), 5, 300);

    for attempt in 1..=5 {
        let response = post_login(&state, "chef@example.com", "wrong", "1.2.3.4").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "attempt {attempt}");
    }
    assert_eq!(provider.sign_in_calls(), 5);
}

#[tokio::test]
async fn attempt_over_the_limit_is_rejected_without_credential_check() {
    let provider = MockProvider::always(SignInBehavior::Reject);
    let state = gate_state(provider.clone(), 5, 300);

    for _ in 0..5 {
        post_login(&state, "chef@example.com", "wrong", "1.2.3.4").await;
    }

    let response = post_login(&state, "chef@example.com", "wrong", "1.2.3.4").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .expect("Retry-After header");
    assert!(retry_after >= 1);
    assert!(retry_after <= 300);

    // The sixth attempt never reached the provider.
    assert_eq!(provider.sign_in_calls(), 5);

    let body = body_json(response).await;
    assert_eq!(
        body.get("error").and_then(serde_json::Value::as_str),
        Some("Too many attempts. Please try again later.")
    );
}

#[tokio::test]
async fn successful_login_resets_the_counter() {
    let provider = MockProvider::scripted(
        vec![
            SignInBehavior::Reject,
            SignInBehavior::Reject,
            SignInBehavior::Succeed,
        ],
        SignInBehavior::Reject,
    );
    let state = gate_state(provider.clone(), 3, 300);

    post_login(&state, "chef@example.com", "wrong", "1.2.3.4").await;
    post_login(&state, "chef@example.com", "wrong", "1.2.3.4").await;

    let response = post_login(&state, "chef@example.com", "right", "1.2.3.4").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body.get("data").is_some());

    // Post-success failures start a fresh count: attempt #1, not #4.
    for _ in 0..3 {
        let response = post_login(&state, "chef@example.com", "wrong", "1.2.3.4").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = post_login(&state, "chef@example.com", "wrong", "1.2.3.4").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn window_expiry_starts_a_fresh_count() {
    let provider = MockProvider::always(SignInBehavior::Reject);
    let state = gate_state(provider.clone(), 2, 1);

    for _ in 0..2 {
        post_login(&state, "chef@example.com", "wrong", "1.2.3.4").await;
    }
    let response = post_login(&state, "chef@example.com", "wrong", "1.2.3.4").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = post_login(&state, "chef@example.com", "wrong", "1.2.3.4").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(provider.sign_in_calls(), 3);
}

#[tokio::test]
async fn buckets_are_scoped_per_client_and_account() {
    let provider = MockProvider::always(SignInBehavior::Reject);
    let state = gate_state(provider.clone(), 2, 300);

    for _ in 0..3 {
        post_login(&state, "chef@example.com", "wrong", "1.2.3.4").await;
    }

    // Same account from another address, and another account from the
    // throttled address, both still reach the provider.
    let response = post_login(&state, "chef@example.com", "wrong", "5.6.7.8").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = post_login(&state, "owner@example.com", "wrong", "1.2.3.4").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_account_and_wrong_password_are_indistinguishable() {
    let wrong_password = MockProvider::always(SignInBehavior::Reject);
    let unknown_account = MockProvider::always(SignInBehavior::Outage);

    let first = post_login(
        &gate_state(wrong_password, 5, 300),
        "chef@example.com",
        "wrong",
        "1.2.3.4",
    )
    .await;
    let second = post_login(
        &gate_state(unknown_account, 5, 300),
        "ghost@example.com",
        "whatever",
        "1.2.3.4",
    )
    .await;

    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(second.status(), StatusCode::UNAUTHORIZED);

    let first_bytes = to_bytes(first.into_body(), usize::MAX).await.unwrap();
    let second_bytes = to_bytes(second.into_body(), usize::MAX).await.unwrap();
    assert_eq!(first_bytes, second_bytes);
}

#[tokio::test]
async fn counter_store_failure_fails_closed() {
    let provider = MockProvider::always(SignInBehavior::Succeed);
    let state = gate_state_with(Arc::new(FailingCounterStore), provider.clone(), 5, 300);

    let response = post_login(&state, "chef@example.com", "right", "1.2.3.4").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(provider.sign_in_calls(), 0);

    let body = body_json(response).await;
    assert_eq!(
        body.get("error").and_then(serde_json::Value::as_str),
        Some("Service unavailable")
    );
}

#[tokio::test]
async fn responses_carry_cors_for_unrecognized_origins() {
    let provider = MockProvider::always(SignInBehavior::Reject);
    let state = gate_state(provider, 5, 300);

    let mut headers = HeaderMap::new();
    headers.insert(header::ORIGIN, HeaderValue::from_static("https://evil.example"));
    let response = login(
        headers,
        Extension(state),
        Some(Json(LoginRequest {
            email: "chef@example.com".to_string(),
            password: "wrong".to_string(),
        })),
    )
    .await;

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some("https://stellina-ristorante.de")
    );
    assert_eq!(
        response
            .headers()
            .get(header::VARY)
            .and_then(|value| value.to_str().ok()),
        Some("Origin")
    );
}

#[tokio::test]
async fn verify_admin_missing_header_is_unauthorized() {
    let state = gate_state(MockProvider::invalid_token(), 5, 300);

    let response = post_verify(&state, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(
        body.get("isAdmin").and_then(serde_json::Value::as_bool),
        Some(false)
    );
    assert_eq!(
        body.get("error").and_then(serde_json::Value::as_str),
        Some("Unauthorized")
    );
}

#[tokio::test]
async fn verify_admin_rejects_unvalidated_token() {
    let state = gate_state(MockProvider::invalid_token(), 5, 300);

    let response = post_verify(&state, Some("Bearer bogus")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(
        body.get("error").and_then(serde_json::Value::as_str),
        Some("Invalid token")
    );
}

#[tokio::test]
async fn verify_admin_staff_role_is_a_plain_false() {
    let user_id = Uuid::new_v4();
    let state = gate_state(MockProvider::with_token(user_id, RoleBehavior::Staff), 5, 300);

    let response = post_verify(&state, Some("Bearer staff-token")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(
        body.get("isAdmin").and_then(serde_json::Value::as_bool),
        Some(false)
    );
    assert_eq!(
        body.get("userId").and_then(serde_json::Value::as_str),
        Some(user_id.to_string().as_str())
    );
}

#[tokio::test]
async fn verify_admin_confirms_admin_role() {
    let user_id = Uuid::new_v4();
    let state = gate_state(MockProvider::with_token(user_id, RoleBehavior::Admin), 5, 300);

    let response = post_verify(&state, Some("Bearer admin-token")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(
        body.get("isAdmin").and_then(serde_json::Value::as_bool),
        Some(true)
    );
}

#[tokio::test]
async fn verify_admin_role_query_failure_is_not_admin() {
    let user_id = Uuid::new_v4();
    let state = gate_state(MockProvider::with_token(user_id, RoleBehavior::Error), 5, 300);

    let response = post_verify(&state, Some("Bearer admin-token")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(
        body.get("isAdmin").and_then(serde_json::Value::as_bool),
        Some(false)
    );
    assert_eq!(
        body.get("error").and_then(serde_json::Value::as_str),
        Some("Failed to verify role")
    );
}
