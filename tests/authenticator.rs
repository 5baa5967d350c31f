//! Authenticator behaviour against the in-memory account store.

use async_trait::async_trait;
use auth_service::auth::{AccountAuthenticator, CredentialHasher, SignupCommand, TokenService};
use auth_service::config::HashingConfig;
use auth_service::db::{AccountStore, InMemoryAccountStore, StoreError};
use auth_service::models::{Account, NewAccount, TokenClaim};
use auth_service::AppError;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

const SECRET: &str = "integration-secret-of-32-bytes!!";

fn hasher() -> CredentialHasher {
    CredentialHasher::new(&HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
        workers: 4,
    })
    .unwrap()
}

fn tokens() -> TokenService {
    TokenService::new(SECRET, Duration::from_secs(3600)).unwrap()
}

fn setup() -> (AccountAuthenticator, InMemoryAccountStore) {
    let store = InMemoryAccountStore::new();
    let auth = AccountAuthenticator::new(Arc::new(store.clone()), hasher(), tokens());
    (auth, store)
}

fn signup(username: &str, email: &str, password: &str) -> SignupCommand {
    SignupCommand {
        username: username.into(),
        email: email.into(),
        password: password.into(),
        roles: None,
    }
}

#[tokio::test]
async fn signup_succeeds_once_per_email() {
    let (auth, store) = setup();
    let alice = assert_ok!(auth.signup(signup("alice", "alice@x.com", "secret1")).await);
    assert_eq!(alice.username, "alice");
    assert_eq!(alice.email, "alice@x.com");
    assert_eq!(alice.roles, vec!["user"]);

    let again = auth.signup(signup("someone-else", "alice@x.com", "other")).await;
    assert!(matches!(again, Err(AppError::EmailInUse)));

    let stored = store.find_by_id(alice.id).await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "secret1");
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn signup_with_taken_username_is_invalid_input() {
    let (auth, store) = setup();
    auth.signup(signup("alice", "alice@x.com", "secret1")).await.unwrap();

    let err = assert_err!(auth.signup(signup("alice", "fresh@x.com", "secret1")).await);
    match &err {
        AppError::InvalidInput(msg) => assert!(msg.contains("username")),
        other => panic!("expected InvalidInput, got {:?}", other),
    }
    let reply = err.to_reply();
    assert_eq!(reply.code, "INVALID_INPUT");
    assert!(!reply.message.contains("Email"));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn signup_email_check_ignores_case() {
    let (auth, _) = setup();
    assert_ok!(auth.signup(signup("alice", "Alice@X.com", "secret1")).await);
    let again = auth.signup(signup("alice2", "alice@x.com", "secret1")).await;
    assert!(matches!(again, Err(AppError::EmailInUse)));
}

#[tokio::test]
async fn signup_rejects_empty_fields() {
    let (auth, store) = setup();
    for cmd in [
        signup("", "a@x.com", "pw"),
        signup("a", "", "pw"),
        signup("a", "a@x.com", ""),
        signup("   ", "a@x.com", "pw"),
    ] {
        assert!(matches!(auth.signup(cmd).await, Err(AppError::InvalidInput(_))));
    }
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn signup_keeps_explicit_roles() {
    let (auth, _) = setup();
    let mut cmd = signup("root", "root@x.com", "pw");
    cmd.roles = Some(vec!["admin".into(), "user".into(), "admin".into()]);
    let account = assert_ok!(auth.signup(cmd).await);
    assert_eq!(account.roles, vec!["admin", "user"]);
}

#[tokio::test]
async fn login_and_validate_roundtrip() {
    let (auth, _) = setup();
    let alice = auth.signup(signup("alice", "alice@x.com", "secret1")).await.unwrap();

    let wrong = auth.login("alice@x.com", "wrong").await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));

    let ok = assert_ok!(auth.login("alice@x.com", "secret1").await);
    assert_eq!(ok.user, alice);

    let result = assert_ok!(auth.validate_token(&ok.token).await);
    assert!(result.valid);
    let user = result.user.unwrap();
    assert_eq!(user.user_id, alice.id);
    assert_eq!(user.roles, vec!["user"]);
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() {
    let (auth, _) = setup();
    auth.signup(signup("alice", "alice@x.com", "secret1")).await.unwrap();

    let unknown = assert_err!(auth.login("nobody@x.com", "secret1").await);
    let wrong = assert_err!(auth.login("alice@x.com", "nope").await);
    assert_eq!(unknown.to_reply(), wrong.to_reply());
}

#[tokio::test]
async fn deleted_account_token_is_invalid() {
    let (auth, store) = setup();
    let alice = auth.signup(signup("alice", "alice@x.com", "secret1")).await.unwrap();
    let token = auth.login("alice@x.com", "secret1").await.unwrap().token;

    assert!(store.remove(alice.id).await);
    let result = assert_ok!(auth.validate_token(&token).await);
    assert!(!result.valid);
    assert!(result.user.is_none());
}

#[tokio::test]
async fn validation_reports_current_roles() {
    let (auth, store) = setup();
    let alice = auth.signup(signup("alice", "alice@x.com", "secret1")).await.unwrap();
    let token = auth.login("alice@x.com", "secret1").await.unwrap().token;

    store.set_roles(alice.id, vec!["suspended".into()]).await;
    let result = auth.validate_token(&token).await.unwrap();
    assert!(result.valid);
    assert_eq!(result.user.unwrap().roles, vec!["suspended"]);
}

#[tokio::test]
async fn garbage_and_expired_tokens_are_invalid_values() {
    let (auth, _) = setup();
    let alice = auth.signup(signup("alice", "alice@x.com", "secret1")).await.unwrap();

    for token in ["", "garbage", "x.y.z"] {
        let result = assert_ok!(auth.validate_token(token).await);
        assert!(!result.valid);
    }

    let expired = auth
        .tokens()
        .issue_at(
            &TokenClaim {
                subject: alice.id,
                roles: alice.roles.clone(),
            },
            Utc::now() - ChronoDuration::hours(2),
        )
        .unwrap();
    assert!(!auth.validate_token(&expired).await.unwrap().valid);
}

#[tokio::test]
async fn token_from_another_secret_is_invalid() {
    let (auth, _) = setup();
    let alice = auth.signup(signup("alice", "alice@x.com", "secret1")).await.unwrap();
    let foreign = TokenService::new("a-different-secret-also-32-bytes", Duration::from_secs(60))
        .unwrap()
        .issue(&TokenClaim {
            subject: alice.id,
            roles: vec!["admin".into()],
        })
        .unwrap();
    assert!(!auth.validate_token(&foreign).await.unwrap().valid);
}

/// Store whose existence pre-check always misses, as if a concurrent signup
/// committed between the check and the insert.
struct RacingStore(InMemoryAccountStore);

#[async_trait]
impl AccountStore for RacingStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.0.find_by_email(email).await
    }
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        self.0.find_by_id(id).await
    }
    async fn exists_by_email(&self, _email: &str) -> Result<bool, StoreError> {
        Ok(false)
    }
    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.0.insert(account).await
    }
}

#[tokio::test]
async fn unique_violation_on_insert_maps_to_email_in_use() {
    let inner = InMemoryAccountStore::new();
    let auth = AccountAuthenticator::new(Arc::new(RacingStore(inner.clone())), hasher(), tokens());
    auth.signup(signup("alice", "alice@x.com", "secret1")).await.unwrap();

    let second = auth.signup(signup("alice2", "alice@x.com", "secret1")).await;
    assert!(matches!(second, Err(AppError::EmailInUse)));
    assert_eq!(inner.len().await, 1);
}

#[tokio::test]
async fn concurrent_signups_with_same_email_admit_one() {
    let (auth, store) = setup();
    let mut handles = Vec::new();
    for i in 0..8 {
        let auth = auth.clone();
        handles.push(tokio::spawn(async move {
            auth.signup(signup(&format!("user{}", i), "race@x.com", "pw")).await
        }));
    }
    let mut created = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::EmailInUse) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(store.len().await, 1);
}

/// Store that always fails, to check failures are propagated.
struct BrokenStore;

#[async_trait]
impl AccountStore for BrokenStore {
    async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
        Err(StoreError::Db(sqlx::Error::PoolTimedOut))
    }
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Account>, StoreError> {
        Err(StoreError::Db(sqlx::Error::PoolTimedOut))
    }
    async fn insert(&self, _account: NewAccount) -> Result<Account, StoreError> {
        Err(StoreError::Db(sqlx::Error::PoolTimedOut))
    }
}

#[tokio::test]
async fn store_failures_propagate_as_internal() {
    let auth = AccountAuthenticator::new(Arc::new(BrokenStore), hasher(), tokens());

    let err = assert_err!(auth.signup(signup("a", "a@x.com", "pw")).await);
    assert!(matches!(err, AppError::Store(_)));
    assert_eq!(err.to_reply().code, "INTERNAL");

    let err = assert_err!(auth.login("a@x.com", "pw").await);
    assert!(err.is_internal());

    let token = tokens()
        .issue(&TokenClaim {
            subject: Uuid::new_v4(),
            roles: vec![],
        })
        .unwrap();
    assert!(auth.validate_token(&token).await.unwrap_err().is_internal());
    // Bad tokens never reach the store.
    assert!(!auth.validate_token("garbage").await.unwrap().valid);
}
