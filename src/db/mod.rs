//! Account store: trait, PostgreSQL implementation, in-memory implementation.

mod memory;
mod pool;
mod repositories;

pub use memory::InMemoryAccountStore;
pub use pool::{create_pool, run_migrations, DbPool};
pub use repositories::{
    AccountStore, PgAccountStore, StoreError, EMAIL_UNIQUE_CONSTRAINT, USERNAME_UNIQUE_CONSTRAINT,
};
