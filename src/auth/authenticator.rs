//! Account authenticator: signup, login and token validation against the store.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::auth::{CredentialHasher, TokenService};
use crate::db::{AccountStore, StoreError, USERNAME_UNIQUE_CONSTRAINT};
use crate::error::{AppError, AppResult};
use crate::models::account::{normalize_email, normalize_roles, NewAccount, PublicAccount, TokenClaim};
use crate::models::message::{LoginResponse, ValidatedUser, ValidationResult};

/// Input for [`AccountAuthenticator::signup`].
#[derive(Debug, Clone)]
pub struct SignupCommand {
    pub username: String,
    pub email: String,
    pub password: String,
    pub roles: Option<Vec<String>>,
}

/// Holds no per-request state; one instance serves all concurrent requests.
#[derive(Clone)]
pub struct AccountAuthenticator {
    store: Arc<dyn AccountStore>,
    hasher: CredentialHasher,
    tokens: TokenService,
}

impl AccountAuthenticator {
    pub fn new(store: Arc<dyn AccountStore>, hasher: CredentialHasher, tokens: TokenService) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[instrument(skip(self, cmd), fields(username = %cmd.username))]
    pub async fn signup(&self, cmd: SignupCommand) -> AppResult<PublicAccount> {
        let username = cmd.username.trim();
        let email = normalize_email(&cmd.email);
        if username.is_empty() || email.is_empty() || cmd.password.is_empty() {
            return Err(AppError::InvalidInput(
                "username, email and password are required".to_string(),
            ));
        }

        // Best-effort; the unique constraint on insert is the real guard.
        if self.store.exists_by_email(&email).await? {
            debug!("signup rejected: email already registered");
            return Err(AppError::EmailInUse);
        }

        let password_hash = self.hasher.hash_async(&cmd.password).await?;
        let account = self
            .store
            .insert(NewAccount {
                username: username.to_string(),
                email,
                password_hash,
                roles: normalize_roles(cmd.roles),
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(constraint)
                    if constraint == USERNAME_UNIQUE_CONSTRAINT =>
                {
                    debug!("signup rejected: username taken");
                    AppError::InvalidInput("username already taken".to_string())
                }
                StoreError::UniqueViolation(constraint) => {
                    debug!(%constraint, "signup lost insert race");
                    AppError::EmailInUse
                }
                other => AppError::Store(other),
            })?;

        info!(account_id = %account.id, "account created");
        Ok(PublicAccount::from(account))
    }

    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginResponse> {
        let email = normalize_email(email);
        let account = match self.store.find_by_email(&email).await? {
            Some(a) => a,
            None => {
                self.hasher.verify_dummy_async(password).await?;
                debug!("login rejected: unknown email");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !self
            .hasher
            .verify_async(password, &account.password_hash)
            .await?
        {
            debug!(account_id = %account.id, "login rejected: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(&TokenClaim::from(&account))?;
        info!(account_id = %account.id, "login succeeded");
        Ok(LoginResponse {
            token,
            user: PublicAccount::from(account),
        })
    }

    /// Token problems yield `valid: false`; only store failures are errors.
    /// Roles are re-read from the store so revocations apply to issued tokens.
    #[instrument(skip_all)]
    pub async fn validate_token(&self, token: &str) -> AppResult<ValidationResult> {
        let claim = match self.tokens.verify(token) {
            Ok(c) => c,
            Err(_) => return Ok(ValidationResult::invalid()),
        };

        match self.store.find_by_id(claim.subject).await? {
            Some(account) => Ok(ValidationResult::valid(ValidatedUser {
                user_id: account.id,
                roles: account.roles,
            })),
            None => {
                debug!(account_id = %claim.subject, "token subject no longer exists");
                Ok(ValidationResult::invalid())
            }
        }
    }
}
