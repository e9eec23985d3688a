//! Authentication for the timeslots scheduler.
//!
//! Passwords are hashed with argon2id. Bearer tokens are RS256 JWTs: the
//! private key stays with the process that issues them, and anything that
//! guards protected routes only needs the public key.

pub mod error;
pub mod keys;
pub mod login;
pub mod password;
pub mod token;

pub use error::{Error, Result};
pub use login::Authenticator;
pub use password::{HashCost, PasswordHasher};
pub use token::{TokenIssuer, TokenVerifier, bearer_token};
