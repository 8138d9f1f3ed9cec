//! Per-request CORS headers.
//!
//! The allow-list is explicit; an unrecognized `Origin` gets the production
//! (first) origin back instead of being mirrored, and every response varies
//! on `Origin`. That substitution rules out `tower_http::cors::CorsLayer`,
//! which can only echo or omit the header, so the headers are built here and
//! attached by the handlers.

use axum::{
    extract::Extension,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use super::state::{GateConfig, GateState};

pub(crate) fn resolve_origin<'a>(config: &'a GateConfig, origin: Option<&'a str>) -> &'a str {
    origin
        .filter(|origin| {
            config
                .allowed_origins()
                .iter()
                .any(|allowed| allowed == origin)
        })
        .unwrap_or_else(|| config.fallback_origin())
}

pub(crate) fn request_origin(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
}

pub(crate) fn cors_headers(config: &GateConfig, origin: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(resolve_origin(config, origin)) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("authorization, x-client-info, apikey, content-type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));

    headers
}

/// Cross-origin preflight for the POST routes.
pub async fn preflight(headers: HeaderMap, state: Extension<Arc<GateState>>) -> impl IntoResponse {
    let origin = request_origin(&headers).map(str::to_string);
    (
        StatusCode::OK,
        cors_headers(state.config(), origin.as_deref()),
    )
}
