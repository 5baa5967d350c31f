//! Token service: JWT issue and validation.

use crate::error::{AppError, AppResult};
use crate::models::account::TokenClaim;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account id
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies HS256 tokens with a process-wide secret and TTL.
#[derive(Clone)]
pub struct TokenService {
    keys: Arc<Keys>,
    ttl: Duration,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str, ttl: std::time::Duration) -> AppResult<Self> {
        if secret.is_empty() {
            return Err(AppError::Config("token secret must not be empty".to_string()));
        }
        let ttl = Duration::from_std(ttl)
            .map_err(|e| AppError::Config(format!("token ttl: {}", e)))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            ttl,
            validation,
        })
    }

    pub fn issue(&self, claim: &TokenClaim) -> AppResult<String> {
        self.issue_at(claim, Utc::now())
    }

    /// Issue as if the clock read `now`; expiry is `now + ttl`.
    pub fn issue_at(&self, claim: &TokenClaim, now: DateTime<Utc>) -> AppResult<String> {
        let exp = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("token expiry out of range")))?;
        let claims = Claims {
            sub: claim.subject.to_string(),
            roles: claim.roles.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("jwt encode: {}", e)))?;
        Ok(token)
    }

    /// Every failure (malformed, bad signature, expired, bad subject) is `InvalidToken`.
    pub fn verify(&self, token: &str) -> AppResult<TokenClaim> {
        let data = decode::<Claims>(token, &self.keys.decoding, &self.validation).map_err(|e| {
            debug!(kind = ?e.kind(), "token rejected");
            AppError::InvalidToken
        })?;
        let subject = Uuid::parse_str(&data.claims.sub).map_err(|_| {
            debug!("token subject is not an account id");
            AppError::InvalidToken
        })?;
        Ok(TokenClaim {
            subject,
            roles: data.claims.roles,
        })
    }
}
