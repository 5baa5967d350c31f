//! Application error types and their wire representation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::StoreError;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Email already in use")]
    EmailInUse,

    /// Same error for unknown account and wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Same error for malformed, forged and expired tokens.
    #[error("Invalid token")]
    InvalidToken,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error body sent back over the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub code: String,
    pub status: u16,
    pub message: String,
}

impl AppError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) | AppError::Serialization(_) => "INVALID_INPUT",
            AppError::EmailInUse => "EMAIL_IN_USE",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::Config(_)
            | AppError::Redis(_)
            | AppError::Store(_)
            | AppError::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP-equivalent status, for callers that bridge replies to HTTP.
    pub fn status(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) | AppError::Serialization(_) => 400,
            AppError::EmailInUse => 409,
            AppError::InvalidCredentials | AppError::InvalidToken => 401,
            AppError::Config(_)
            | AppError::Redis(_)
            | AppError::Store(_)
            | AppError::Internal(_) => 500,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status() >= 500
    }

    /// Wire form. Internal causes stay in the logs.
    pub fn to_reply(&self) -> ErrorReply {
        let message = match self {
            AppError::Serialization(e) => format!("Invalid payload: {}", e),
            e if e.is_internal() => "Internal error".to_string(),
            e => e.to_string(),
        };
        ErrorReply {
            code: self.code().to_string(),
            status: self.status(),
            message,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
