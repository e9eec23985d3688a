//! Phone + password login.

use slots_core::{Classify, ErrorKind, store::ScheduleStore};

use crate::{Error, PasswordHasher, Result, TokenIssuer};

/// Checks credentials against the store and issues a token on success.
#[derive(Clone)]
pub struct Authenticator {
  hasher:     PasswordHasher,
  issuer:     TokenIssuer,
  /// Verified against when the phone is unknown, so both failure paths
  /// cost one argon2 run.
  dummy_hash: String,
}

impl Authenticator {
  pub fn new(hasher: PasswordHasher, issuer: TokenIssuer) -> Result<Self> {
    let dummy_hash = hasher.hash("timeslots-no-such-user")?;
    Ok(Self { hasher, issuer, dummy_hash })
  }

  pub fn hasher(&self) -> &PasswordHasher { &self.hasher }

  /// Unknown phone and wrong password both yield
  /// [`Error::InvalidCredentials`]. Any other store failure is passed
  /// through with its kind intact.
  pub async fn login<S: ScheduleStore>(
    &self,
    store: &S,
    phone: &str,
    password: &str,
  ) -> Result<String> {
    let user = match store.get_user_by_phone(phone).await {
      Ok(user) => user,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        let _ = self.hasher.verify(password, &self.dummy_hash);
        tracing::debug!("login for unknown phone");
        return Err(Error::InvalidCredentials);
      }
      Err(e) => {
        return Err(Error::Store { kind: e.kind(), source: Box::new(e) });
      }
    };

    if !self.hasher.verify(password, &user.password_hash) {
      tracing::debug!(user_id = user.id, "login with wrong password");
      return Err(Error::InvalidCredentials);
    }

    let token = self.issuer.issue(user.id, user.role)?;
    tracing::info!(user_id = user.id, role = %user.role, "user logged in");
    Ok(token)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use slots_core::user::{NewUser, Role};
  use slots_store_sqlite::SqliteStore;

  use super::*;
  use crate::{HashCost, TokenVerifier, keys, testdata};

  const PHONE: &str = "+7 999 123 45 67";

  async fn setup() -> (Authenticator, SqliteStore, i64) {
    let hasher = PasswordHasher::new(HashCost::minimal()).unwrap();
    let issuer = TokenIssuer::new(
      keys::load_signing_key(testdata::PRIVATE).unwrap(),
      "timeslots",
      Duration::hours(1),
    )
    .unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();
    let user = store
      .create_user(NewUser {
        last_name:     "Petrova".into(),
        first_name:    "Anna".into(),
        phone:         PHONE.into(),
        email:         None,
        password_hash: hasher.hash("jopa").unwrap(),
        role:          Role::Coach,
        notify_lead:   60,
      })
      .await
      .unwrap();
    (Authenticator::new(hasher, issuer).unwrap(), store, user.id)
  }

  #[tokio::test]
  async fn correct_credentials_issue_a_token() {
    let (auth, store, id) = setup().await;
    let token = auth.login(&store, PHONE, "jopa").await.unwrap();

    let verifier = TokenVerifier::new(
      keys::load_verifying_key(testdata::PUBLIC).unwrap(),
      "timeslots",
    );
    let claims = verifier.verify(&token).unwrap();
    assert_eq!(claims.user_id, id);
    assert_eq!(claims.role, Role::Coach);
  }

  #[tokio::test]
  async fn wrong_password_is_invalid_credentials() {
    let (auth, store, _) = setup().await;
    let err = auth.login(&store, PHONE, "wrong").await.unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
  }

  #[tokio::test]
  async fn unknown_phone_is_indistinguishable_from_wrong_password() {
    let (auth, store, _) = setup().await;
    let unknown = auth.login(&store, "+1 000", "jopa").await.unwrap_err();
    let wrong = auth.login(&store, PHONE, "nope").await.unwrap_err();
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert_eq!(unknown.kind(), wrong.kind());
  }

  #[tokio::test]
  async fn deleted_user_cannot_log_in() {
    let (auth, store, id) = setup().await;
    store.delete_user(id).await.unwrap();
    let err = auth.login(&store, PHONE, "jopa").await.unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));
  }
}
