//! Loading RSA key material from PEM files.
//!
//! Keys are read once at startup. A missing or malformed key is an
//! [`Error::Key`], which callers treat as fatal.

use std::path::Path;

use jsonwebtoken::{DecodingKey, EncodingKey};

use crate::{Error, Result};

fn read_pem(path: &Path) -> Result<Vec<u8>> {
  let pem = std::fs::read(path).map_err(|e| Error::Key {
    path:   path.to_owned(),
    reason: e.to_string(),
  })?;
  if pem.is_empty() {
    return Err(Error::Key { path: path.to_owned(), reason: "file is empty".into() });
  }
  Ok(pem)
}

/// Private key used to sign tokens (PKCS#1 or PKCS#8 PEM).
pub fn load_signing_key(path: impl AsRef<Path>) -> Result<EncodingKey> {
  let path = path.as_ref();
  EncodingKey::from_rsa_pem(&read_pem(path)?).map_err(|e| Error::Key {
    path:   path.to_owned(),
    reason: e.to_string(),
  })
}

/// Public key used to verify tokens (SPKI or PKCS#1 PEM).
pub fn load_verifying_key(path: impl AsRef<Path>) -> Result<DecodingKey> {
  let path = path.as_ref();
  DecodingKey::from_rsa_pem(&read_pem(path)?).map_err(|e| Error::Key {
    path:   path.to_owned(),
    reason: e.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use slots_core::{Classify, ErrorKind};

  use super::*;
  use crate::testdata;

  #[test]
  fn loads_fixture_keys() {
    assert!(load_signing_key(testdata::PRIVATE).is_ok());
    assert!(load_verifying_key(testdata::PUBLIC).is_ok());
  }

  #[test]
  fn missing_key_is_fatal() {
    let Err(err) = load_signing_key("/nonexistent/private_rsa.pem") else {
      panic!("missing private key loaded");
    };
    assert_eq!(err.kind(), ErrorKind::Fatal);
    assert!(err.to_string().contains("/nonexistent/private_rsa.pem"));

    let Err(err) = load_verifying_key("/nonexistent/public_rsa.pem") else {
      panic!("missing public key loaded");
    };
    assert_eq!(err.kind(), ErrorKind::Fatal);
  }

  #[test]
  fn non_pem_file_is_rejected() {
    let manifest = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");
    assert!(matches!(load_signing_key(manifest), Err(Error::Key { .. })));
    assert!(matches!(load_verifying_key(manifest), Err(Error::Key { .. })));
  }
}
