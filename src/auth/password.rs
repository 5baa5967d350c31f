//! Credential hasher: salted Argon2id hashing on a bounded blocking pool.

use crate::config::HashingConfig;
use crate::error::{AppError, AppResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Hashes and verifies passwords. Cheap to clone; clones share the worker permits.
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
    permits: Arc<Semaphore>,
    dummy_hash: Arc<str>,
}

impl CredentialHasher {
    pub fn new(config: &HashingConfig) -> AppResult<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AppError::Config(format!("argon2 params: {}", e)))?;
        let mut hasher = Self {
            params,
            permits: Arc::new(Semaphore::new(config.workers.max(1))),
            dummy_hash: Arc::from(""),
        };
        hasher.dummy_hash = Arc::from(hasher.hash("dummy password for unknown accounts")?);
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash with a fresh random salt. Blocking; prefer [`Self::hash_async`] from async code.
    pub fn hash(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("hash: {}", e)))?
            .to_string();
        Ok(hash)
    }

    /// `false` on mismatch and on any malformed `hash`.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "stored hash is malformed");
                return false;
            }
        };
        // Cost parameters come from the PHC string, not from `self.params`.
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burn one verification so unknown-account logins cost the same as wrong passwords.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }

    pub async fn hash_async(&self, password: &str) -> AppResult<String> {
        let this = self.clone();
        let password = password.to_owned();
        self.run_blocking(move || this.hash(&password)).await?
    }

    pub async fn verify_async(&self, password: &str, hash: &str) -> AppResult<bool> {
        let this = self.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        self.run_blocking(move || this.verify(&password, &hash)).await
    }

    pub async fn verify_dummy_async(&self, password: &str) -> AppResult<()> {
        let this = self.clone();
        let password = password.to_owned();
        self.run_blocking(move || this.verify_dummy(&password)).await
    }

    async fn run_blocking<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("hash pool closed: {}", e)))?;
        // The permit lives as long as the blocking job, even if the caller goes away.
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "hashing task failed");
            AppError::Internal(anyhow::anyhow!("hashing task: {}", e))
        })
    }
}
