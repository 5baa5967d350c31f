//! Authentication core: password hashing, tokens, account authenticator.

mod authenticator;
mod jwt;
mod password;

pub use authenticator::{AccountAuthenticator, SignupCommand};
pub use jwt::{Claims, TokenService};
pub use password::CredentialHasher;
