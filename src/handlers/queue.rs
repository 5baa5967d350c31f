//! Queue message handlers: decode request, validate, run the operation, build the reply.

use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::auth::{AccountAuthenticator, SignupCommand};
use crate::error::{AppError, AppResult};
use crate::models::message::{
    validate_request, LoginRequest, Outcome, Pattern, ReplyEnvelope, RequestEnvelope,
    SignupRequest, ValidateTokenRequest,
};

fn parse_data<T: DeserializeOwned>(data: serde_json::Value) -> AppResult<T> {
    serde_json::from_value(data).map_err(|e| AppError::InvalidInput(e.to_string()))
}

/// Run one request against the authenticator and produce its reply.
pub async fn dispatch(auth: &AccountAuthenticator, envelope: RequestEnvelope) -> ReplyEnvelope {
    let outcome = match handle(auth, &envelope.pattern, envelope.data).await {
        Ok(value) => Outcome::Response(value),
        Err(e) => {
            if e.is_internal() {
                error!(id = %envelope.id, pattern = %envelope.pattern, error = %e, "request failed");
            }
            Outcome::Err(e.to_reply())
        }
    };
    ReplyEnvelope {
        id: envelope.id,
        outcome,
    }
}

async fn handle(
    auth: &AccountAuthenticator,
    pattern: &str,
    data: serde_json::Value,
) -> AppResult<serde_json::Value> {
    let pattern = Pattern::parse(pattern)
        .ok_or_else(|| AppError::InvalidInput(format!("unknown pattern: {}", pattern)))?;

    let value = match pattern {
        Pattern::Signup => {
            let req: SignupRequest = parse_data(data)?;
            validate_request(&req)?;
            let account = auth
                .signup(SignupCommand {
                    username: req.username,
                    email: req.email,
                    password: req.password,
                    roles: req.roles,
                })
                .await?;
            serde_json::to_value(account)?
        }
        Pattern::Login => {
            let req: LoginRequest = parse_data(data)?;
            validate_request(&req)?;
            serde_json::to_value(auth.login(&req.email, &req.password).await?)?
        }
        Pattern::ValidateToken => {
            // Garbage input is just an invalid token.
            let token = parse_data::<ValidateTokenRequest>(data)
                .map(|r| r.token)
                .unwrap_or_default();
            serde_json::to_value(auth.validate_token(&token).await?)?
        }
    };
    Ok(value)
}

/// Decode a raw queue message. Malformed messages are logged and dropped.
pub fn decode(raw: &str) -> Option<RequestEnvelope> {
    match serde_json::from_str::<RequestEnvelope>(raw) {
        Ok(env) => Some(env),
        Err(e) => {
            warn!(error = %e, "dropping malformed queue message");
            None
        }
    }
}
