//! Admin role verification for the back-office.
//!
//! The bearer token is validated by the identity provider and the role check
//! runs server-side against the authorization store. A client-supplied user
//! id or role claim is never trusted, and a failed role query is reported as
//! an error, not as admin.

use axum::{
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::pordisto::cors::{cors_headers, request_origin};
use crate::pordisto::provider::Role;
use crate::pordisto::state::GateState;
use crate::pordisto::types::VerifyAdminResponse;

#[utoipa::path(
    post,
    path = "/verify-admin",
    params(
        ("Authorization" = String, Header, description = "Bearer token issued by the identity provider")
    ),
    responses(
        (status = 200, description = "Role decision", body = VerifyAdminResponse),
        (status = 401, description = "Missing or invalid bearer token", body = VerifyAdminResponse),
        (status = 500, description = "Role check failed", body = VerifyAdminResponse)
    ),
    tag = "auth"
)]
pub async fn verify_admin(headers: HeaderMap, state: Extension<Arc<GateState>>) -> Response {
    let cors = cors_headers(state.config(), request_origin(&headers));

    let Some(token) = bearer_token(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            cors,
            Json(VerifyAdminResponse::denied("Unauthorized")),
        )
            .into_response();
    };

    let claims = match state.provider().validate_token(&token).await {
        Ok(claims) => claims,
        Err(err) => {
            debug!("Token validation failed: {err}");
            return (
                StatusCode::UNAUTHORIZED,
                cors,
                Json(VerifyAdminResponse::denied("Invalid token")),
            )
                .into_response();
        }
    };

    match state.provider().has_role(claims.sub, Role::Admin).await {
        Ok(is_admin) => {
            info!(user_id = %claims.sub, is_admin, "Admin verification decision");
            (
                StatusCode::OK,
                cors,
                Json(VerifyAdminResponse {
                    is_admin,
                    user_id: Some(claims.sub.to_string()),
                    error: None,
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("Role check failed for {}: {err}", claims.sub);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                cors,
                Json(VerifyAdminResponse::denied("Failed to verify role")),
            )
                .into_response()
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
