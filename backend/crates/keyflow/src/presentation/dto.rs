//! API DTOs (Data Transfer Objects)
//!
//! Wire shapes are snake_case and timestamps are ISO-8601, matching the
//! third-party scripts and provider callbacks that consume this API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query for GET /api/callback/{provider}
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub checkpoint_id: Option<Uuid>,
    pub session_token: Option<String>,
    /// Provider-issued completion token
    #[serde(default)]
    pub token: Option<String>,
}

/// Body for POST /api/callback/{provider}
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackBody {
    pub checkpoint_id: Option<Uuid>,
    pub session_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Response for callback verification (when not redirecting)
#[derive(Debug, Clone, Serialize)]
pub struct CallbackResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Body for POST /api/checkpoint/complete
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteRequest {
    pub checkpoint_id: Option<Uuid>,
    pub session_token: Option<String>,
    #[serde(default)]
    pub hwid: Option<String>,
}

/// Response for POST /api/checkpoint/complete
#[derive(Debug, Clone, Serialize)]
pub struct CompleteResponse {
    pub message: &'static str,
}

/// Body for POST /api/key/get
#[derive(Debug, Clone, Deserialize)]
pub struct IssueKeyRequest {
    pub script_id: Option<Uuid>,
    pub session_token: Option<String>,
    #[serde(default)]
    pub hwid: Option<String>,
}

/// Response for POST /api/key/get
#[derive(Debug, Clone, Serialize)]
pub struct IssueKeyResponse {
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

/// Query for GET /api/key/get
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateKeyQuery {
    pub script_id: Option<Uuid>,
    pub key: Option<String>,
    #[serde(default)]
    pub hwid: Option<String>,
}

/// Response for GET /api/key/get
#[derive(Debug, Clone, Serialize)]
pub struct ValidateKeyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl ValidateKeyResponse {
    pub fn valid(expires_at: DateTime<Utc>) -> Self {
        Self {
            valid: true,
            expires_at: Some(expires_at),
            error: None,
        }
    }

    pub fn invalid(error: &'static str) -> Self {
        Self {
            valid: false,
            expires_at: None,
            error: Some(error),
        }
    }
}
