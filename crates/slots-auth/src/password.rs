//! Salted argon2id password hashing.

use argon2::{
  Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _,
  PasswordVerifier, Version, password_hash::SaltString,
};
use rand_core::OsRng;
use serde::Deserialize;

use crate::{Error, Result};

/// Tunable argon2 cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HashCost {
  pub memory_kib:  u32,
  pub iterations:  u32,
  pub parallelism: u32,
}

impl Default for HashCost {
  fn default() -> Self {
    Self {
      memory_kib:  Params::DEFAULT_M_COST,
      iterations:  Params::DEFAULT_T_COST,
      parallelism: Params::DEFAULT_P_COST,
    }
  }
}

impl HashCost {
  /// The cheapest settings argon2 accepts. Only for tests.
  pub const fn minimal() -> Self {
    Self { memory_kib: Params::MIN_M_COST, iterations: 1, parallelism: 1 }
  }
}

/// Hashes new passwords at a fixed cost and verifies existing PHC strings.
///
/// Verification reads the cost from the stored hash, so raising the cost
/// does not invalidate old hashes.
#[derive(Clone)]
pub struct PasswordHasher {
  argon2: Argon2<'static>,
}

impl PasswordHasher {
  pub fn new(cost: HashCost) -> Result<Self> {
    let params =
      Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
        .map_err(|e| Error::Hash(e.to_string()))?;
    Ok(Self {
      argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
    })
  }

  /// Produce a PHC string, e.g. `$argon2id$v=19$…`.
  pub fn hash(&self, plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(
      self
        .argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| Error::Hash(e.to_string()))?
        .to_string(),
    )
  }

  /// `false` on mismatch and on hashes that do not parse.
  pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
      return false;
    };
    self
      .argon2
      .verify_password(plaintext.as_bytes(), &parsed)
      .is_ok()
  }
}
