//! The mutation gate.
//!
//! Every token-gated write goes through two steps:
//!
//! 1. [`MutationGate::authorize`] checks that the presented token is exactly
//!    the record's stored token and still fresh, and yields a [`Rotation`].
//! 2. [`MutationGate::commit`] writes the caller's changes together with the
//!    rotated token, as one compare-and-set against the previous token.
//!
//! A caller holding any token other than the last one issued is rejected,
//! including one that lost a race against a concurrent successful write.

use constant_time_eq::constant_time_eq;

use crate::{
  Error, Result,
  identity::Identity,
  store::IdentityStore,
  validator::{TokenValidator, now_ms},
};

/// The token swap a successful [`MutationGate::authorize`] allows.
#[must_use = "a rotation does nothing until it is committed"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
  /// The token presented by the caller, equal to the stored one.
  pub previous: String,
  /// The replacement to store.
  pub next:     String,
}

#[derive(Debug, Clone)]
pub struct MutationGate {
  validator: TokenValidator,
}

impl MutationGate {
  pub fn new(validator: TokenValidator) -> Self { Self { validator } }

  pub fn validator(&self) -> &TokenValidator { &self.validator }

  pub fn authorize(&self, record: &Identity, presented: Option<&str>) -> Result<Rotation> {
    self.authorize_at(record, presented, now_ms())
  }

  /// [`authorize`](Self::authorize) against an explicit clock reading.
  pub fn authorize_at(
    &self,
    record: &Identity,
    presented: Option<&str>,
    now_ms: i64,
  ) -> Result<Rotation> {
    let presented = match presented {
      Some(t) if !t.is_empty() => t,
      _ => return Err(Error::MissingToken),
    };

    match record.current_token.as_deref() {
      Some(stored)
        if !stored.is_empty()
          && constant_time_eq(stored.as_bytes(), presented.as_bytes()) => {}
      _ => return Err(Error::StaleOrForgedToken),
    }

    let next = self.validator.check_at(presented, record.subject_id, now_ms)?;

    Ok(Rotation { previous: presented.to_owned(), next })
  }

  /// Persist `record` with the rotated token, provided the stored token is
  /// still `rotation.previous`. Fails with
  /// [`Error::StaleOrForgedToken`] and writes nothing otherwise.
  pub async fn commit<S: IdentityStore>(
    &self,
    store: &S,
    mut record: Identity,
    rotation: Rotation,
  ) -> Result<Identity> {
    let subject_id = record.subject_id;
    record.current_token = Some(rotation.next);

    match store
      .save_if_token(record, rotation.previous)
      .await
      .map_err(Error::store)?
    {
      Some(saved) => Ok(saved),
      None => {
        tracing::warn!(%subject_id, "token rotated concurrently, write discarded");
        Err(Error::StaleOrForgedToken)
      }
    }
  }
}
