//! RS256 bearer tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use slots_core::{claims::Claims, user::Role};

use crate::{Error, Result};

/// The only algorithm tokens are signed or accepted with.
pub const ALGORITHM: Algorithm = Algorithm::RS256;

/// Longest lifetime a token may be issued with, in seconds.
pub const MAX_TTL_SECS: i64 = 366 * 24 * 60 * 60;

/// Signs tokens with the private key.
#[derive(Clone)]
pub struct TokenIssuer {
  key:    EncodingKey,
  issuer: String,
  ttl:    Duration,
}

impl TokenIssuer {
  /// `ttl` must be positive and at most [`MAX_TTL_SECS`].
  pub fn new(
    key: EncodingKey,
    issuer: impl Into<String>,
    ttl: Duration,
  ) -> Result<Self> {
    if ttl <= Duration::zero() || ttl > Duration::seconds(MAX_TTL_SECS) {
      return Err(Error::Lifetime(ttl));
    }
    Ok(Self { key, issuer: issuer.into(), ttl })
  }

  pub fn issue(&self, user_id: i64, role: Role) -> Result<String> {
    self.issue_at(user_id, role, Utc::now())
  }

  /// Sign a token as if it were issued at `now`.
  pub fn issue_at(
    &self,
    user_id: i64,
    role: Role,
    now: DateTime<Utc>,
  ) -> Result<String> {
    let expires = now
      .checked_add_signed(self.ttl)
      .ok_or(Error::Lifetime(self.ttl))?;
    let claims = Claims {
      user_id,
      role,
      iss: self.issuer.clone(),
      iat: now.timestamp(),
      exp: expires.timestamp(),
    };
    Ok(encode(&Header::new(ALGORITHM), &claims, &self.key)?)
  }
}

/// Checks tokens against the public key.
#[derive(Clone)]
pub struct TokenVerifier {
  key:        DecodingKey,
  validation: Validation,
}

impl TokenVerifier {
  pub fn new(key: DecodingKey, issuer: &str) -> Self {
    let mut validation = Validation::new(ALGORITHM);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "iss"]);
    validation.leeway = 0;
    Self { key, validation }
  }

  /// Any failure (bad signature, wrong algorithm, wrong issuer, expiry,
  /// malformed payload) is [`Error::Unauthorized`]. The reason is logged at
  /// debug level and never returned to the caller.
  pub fn verify(&self, token: &str) -> Result<Claims> {
    decode::<Claims>(token, &self.key, &self.validation)
      .map(|data| data.claims)
      .map_err(|e| {
        tracing::debug!(error = %e, "token rejected");
        Error::Unauthorized
      })
  }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Result<&str> {
  let (scheme, token) = header.split_once(' ').ok_or(Error::Unauthorized)?;
  if !scheme.eq_ignore_ascii_case("bearer") {
    return Err(Error::Unauthorized);
  }
  let token = token.trim();
  if token.is_empty() {
    return Err(Error::Unauthorized);
  }
  Ok(token)
}
