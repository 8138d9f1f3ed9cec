pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod verify_admin;
pub use self::verify_admin::verify_admin;

#[cfg(test)]
mod tests;

// common functions for the handlers
use axum::http::HeaderMap;

/// Normalize an email for hashing and counter lookups.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Client IP for rate limiting, from trusted proxy headers.
/// Precedence: first `x-forwarded-for` hop, then the CDN header, else
/// `"unknown"` so unattributable clients still share one bucket per account.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    headers
        .get("cf-connecting-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| "unknown".to_string(), str::to_string)
}
