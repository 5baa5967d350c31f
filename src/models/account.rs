//! Account entity and the public/claim views derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role assigned when signup does not name any.
pub const DEFAULT_ROLE: &str = "user";

/// Stored account. `password_hash` never leaves the service.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for an account about to be inserted.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

/// Account fields safe to return to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

impl From<&Account> for PublicAccount {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id,
            username: a.username.clone(),
            email: a.email.clone(),
            roles: a.roles.clone(),
        }
    }
}

impl From<Account> for PublicAccount {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            username: a.username,
            email: a.email,
            roles: a.roles,
        }
    }
}

/// Identity carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaim {
    pub subject: Uuid,
    pub roles: Vec<String>,
}

impl From<&Account> for TokenClaim {
    fn from(a: &Account) -> Self {
        Self {
            subject: a.id,
            roles: a.roles.clone(),
        }
    }
}

/// Canonical email form used for lookup and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Apply the default role and drop duplicates, keeping first-seen order.
pub fn normalize_roles(roles: Option<Vec<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for role in roles.unwrap_or_default() {
        let role = role.trim();
        if !role.is_empty() && !out.iter().any(|r| r == role) {
            out.push(role.to_string());
        }
    }
    if out.is_empty() {
        out.push(DEFAULT_ROLE.to_string());
    }
    out
}
