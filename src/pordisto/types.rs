//! Request/response types for the gate endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::provider::Session;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login body: the provider session under `data`.
#[derive(ToSchema, Serialize, Debug)]
pub struct SessionEnvelope {
    #[schema(value_type = Object)]
    pub data: Session,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub(crate) fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyAdminResponse {
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerifyAdminResponse {
    pub(crate) fn denied(error: &str) -> Self {
        Self {
            is_admin: false,
            user_id: None,
            error: Some(error.to_string()),
        }
    }
}
