//! Token claims: who the bearer is and what role they hold.

use serde::{Deserialize, Serialize};

use crate::user::Role;

/// The decoded payload of a verified bearer token. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  #[serde(rename = "userID")]
  pub user_id: i64,
  pub role:    Role,
  /// Issuer.
  pub iss:     String,
  /// Issued-at, seconds since the epoch.
  pub iat:     i64,
  /// Expiry, seconds since the epoch.
  pub exp:     i64,
}
