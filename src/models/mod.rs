//! Data models: accounts, claims, queue payloads.

pub mod account;
pub mod message;

pub use account::{Account, NewAccount, PublicAccount, TokenClaim};
pub use message::{ReplyEnvelope, RequestEnvelope, ValidationResult};
