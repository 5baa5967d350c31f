//! In-memory account store for tests and local runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStore, StoreError, EMAIL_UNIQUE_CONSTRAINT, USERNAME_UNIQUE_CONSTRAINT};
use crate::models::account::{Account, NewAccount};

/// Enforces the same username/email uniqueness as the `users` table,
/// atomically under a single write lock.
#[derive(Clone, Default)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    /// Delete an account; returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.accounts.write().await.remove(&id).is_some()
    }

    /// Replace an account's roles; returns whether it existed.
    pub async fn set_roles(&self, id: Uuid, roles: Vec<String>) -> bool {
        match self.accounts.write().await.get_mut(&id) {
            Some(account) => {
                account.roles = roles;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::UniqueViolation(EMAIL_UNIQUE_CONSTRAINT.to_string()));
        }
        if accounts.values().any(|a| a.username == account.username) {
            return Err(StoreError::UniqueViolation(USERNAME_UNIQUE_CONSTRAINT.to_string()));
        }
        let row = Account {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            roles: account.roles,
            created_at: Utc::now(),
        };
        accounts.insert(row.id, row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            roles: vec!["user".into()],
        }
    }

    #[tokio::test]
    async fn insert_and_find() {
        let store = InMemoryAccountStore::new();
        let a = store.insert(new_account("alice", "alice@x.com")).await.unwrap();
        assert_eq!(store.find_by_id(a.id).await.unwrap().unwrap().email, "alice@x.com");
        assert!(store.exists_by_email("alice@x.com").await.unwrap());
        assert!(store.find_by_email("bob@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_or_username_violates_uniqueness() {
        let store = InMemoryAccountStore::new();
        store.insert(new_account("alice", "alice@x.com")).await.unwrap();
        assert!(matches!(
            store.insert(new_account("other", "alice@x.com")).await,
            Err(StoreError::UniqueViolation(c)) if c == EMAIL_UNIQUE_CONSTRAINT
        ));
        assert!(matches!(
            store.insert(new_account("alice", "other@x.com")).await,
            Err(StoreError::UniqueViolation(c)) if c == USERNAME_UNIQUE_CONSTRAINT
        ));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn remove_and_set_roles() {
        let store = InMemoryAccountStore::new();
        let a = store.insert(new_account("alice", "alice@x.com")).await.unwrap();
        assert!(store.set_roles(a.id, vec!["admin".into()]).await);
        assert_eq!(store.find_by_id(a.id).await.unwrap().unwrap().roles, vec!["admin"]);
        assert!(store.remove(a.id).await);
        assert!(!store.remove(a.id).await);
        assert!(store.is_empty().await);
    }
}
