//! Rate-limited password login.
//!
//! Flow Overview:
//! 1) Validate that both credentials are present (400 before any store hit).
//! 2) Atomically record the attempt for (client IP, email digest).
//! 3) Over the limit: 429 with `Retry-After`, identity provider untouched.
//! 4) Otherwise forward the credentials; success clears the counter.
//!
//! Security boundaries:
//! - Every provider-side failure maps to one fixed 401 body, so responses
//!   never reveal whether an account exists.
//! - A failing counter store fails closed (503): the provider is never
//!   reachable without the throttle in front of it.

use axum::{
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use super::extract_client_ip;
use crate::pordisto::cors::{cors_headers, request_origin};
use crate::pordisto::provider::Session;
use crate::pordisto::rate_limit::AttemptKey;
use crate::pordisto::state::GateState;
use crate::pordisto::types::{ErrorBody, LoginRequest, SessionEnvelope};

const MISSING_CREDENTIALS: &str = "Missing credentials";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const RATE_LIMITED: &str = "Too many attempts. Please try again later.";
const SERVICE_UNAVAILABLE: &str = "Service unavailable";

/// Terminal result of one login attempt. Never says which credential failed.
#[derive(Debug)]
pub enum AuthOutcome {
    Success(Box<Session>),
    InvalidCredentials,
    RateLimited { retry_after_seconds: u64 },
    ServiceUnavailable,
}

impl AuthOutcome {
    fn into_response(self, cors: HeaderMap) -> Response {
        match self {
            Self::Success(session) => (
                StatusCode::OK,
                cors,
                Json(SessionEnvelope { data: *session }),
            )
                .into_response(),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                cors,
                Json(ErrorBody::new(INVALID_CREDENTIALS)),
            )
                .into_response(),
            Self::RateLimited {
                retry_after_seconds,
            } => {
                let mut headers = cors;
                if let Ok(value) = retry_after_seconds.to_string().parse() {
                    headers.insert(header::RETRY_AFTER, value);
                }
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    headers,
                    Json(ErrorBody::new(RATE_LIMITED)),
                )
                    .into_response()
            }
            Self::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                cors,
                Json(ErrorBody::new(SERVICE_UNAVAILABLE)),
            )
                .into_response(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionEnvelope),
        (status = 400, description = "Missing credentials", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 429, description = "Too many attempts, Retry-After holds the remaining window seconds", body = ErrorBody),
        (status = 503, description = "Attempt counter unavailable", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    state: Extension<Arc<GateState>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let cors = cors_headers(state.config(), request_origin(&headers));

    let Some(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            cors,
            Json(ErrorBody::new(MISSING_CREDENTIALS)),
        )
            .into_response();
    };

    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            cors,
            Json(ErrorBody::new(MISSING_CREDENTIALS)),
        )
            .into_response();
    }

    let client_ip = extract_client_ip(&headers);
    let key = AttemptKey::new(&client_ip, email);

    handle_login(&state, &key, email, &request.password)
        .await
        .into_response(cors)
}

pub(crate) async fn handle_login(
    state: &GateState,
    key: &AttemptKey,
    email: &str,
    password: &str,
) -> AuthOutcome {
    let window = state.config().window();

    // Record the attempt before any credential check. A broken store must
    // not leave the provider reachable without a throttle.
    let snapshot = match state.counters().increment(key, window).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!("Attempt counter unavailable, failing closed: {err}");
            return AuthOutcome::ServiceUnavailable;
        }
    };

    if snapshot.count > state.config().attempt_limit() {
        debug!(client_ip = key.client_ip(), "Login attempt rate limited");
        return AuthOutcome::RateLimited {
            retry_after_seconds: snapshot.retry_after_seconds(window),
        };
    }

    match state.provider().sign_in_with_password(email, password).await {
        Ok(session) => {
            // The owner proved identity; a retry or two should not linger.
            if let Err(err) = state.counters().clear(key).await {
                error!("Failed to clear attempt counter after login: {err}");
            }
            AuthOutcome::Success(Box::new(session))
        }
        Err(err) => {
            debug!("Sign-in rejected: {err}");
            AuthOutcome::InvalidCredentials
        }
    }
}
