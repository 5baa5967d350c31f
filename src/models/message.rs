//! Queue request/reply payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult, ErrorReply};
use crate::models::account::PublicAccount;

pub const PATTERN_SIGNUP: &str = "auth.signup";
pub const PATTERN_LOGIN: &str = "auth.login";
pub const PATTERN_VALIDATE_TOKEN: &str = "auth.validate_token";

/// Operation named by a request envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Signup,
    Login,
    ValidateToken,
}

impl Pattern {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            PATTERN_SIGNUP => Some(Pattern::Signup),
            PATTERN_LOGIN => Some(Pattern::Login),
            PATTERN_VALIDATE_TOKEN => Some(Pattern::ValidateToken),
            _ => None,
        }
    }
}

/// Message popped from the request queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// List the reply is pushed to; absent for fire-and-forget requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// Message pushed to `reply_to`: `{"id", "response"}` or `{"id", "err"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub id: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Response(serde_json::Value),
    Err(ErrorReply),
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
    #[serde(default)]
    #[validate(custom(function = "validate_role_names"))]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateTokenRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicAccount,
}

/// Identity reported by a successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedUser {
    pub user_id: Uuid,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub user: Option<ValidatedUser>,
}

impl ValidationResult {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            user: None,
        }
    }

    pub fn valid(user: ValidatedUser) -> Self {
        Self {
            valid: true,
            user: Some(user),
        }
    }
}

#[allow(clippy::ptr_arg)]
fn validate_role_names(roles: &Vec<String>) -> Result<(), ValidationError> {
    if roles.iter().any(|r| r.trim().is_empty() || r.len() > 64) {
        return Err(ValidationError::new("role_name"));
    }
    Ok(())
}

/// Run declarative field checks, mapping failures to `InvalidInput`.
pub fn validate_request<T: Validate>(req: &T) -> AppResult<()> {
    req.validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))
}
