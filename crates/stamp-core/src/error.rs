//! Error types for `stamp-core`.

use thiserror::Error;

use crate::{
  identity::{Identity, SubjectId, UniqueField},
  store::StoreError,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid request: {0}")]
  InvalidRequest(String),

  /// A handle or contact is already taken. On update, `prior` carries the
  /// stored record exactly as it was before the attempt.
  #[error("{field} already in use")]
  Conflict {
    field: UniqueField,
    prior: Option<Box<Identity>>,
  },

  #[error("subject not found: {0}")]
  NotFound(SubjectId),

  #[error("credential mismatch for subject {0}")]
  BadCredential(SubjectId),

  #[error("forbidden: {0}")]
  ForbiddenMutation(String),

  #[error("malformed token: {0}")]
  MalformedToken(String),

  #[error("token issued to subject {found}, expected {expected}")]
  SubjectMismatch {
    expected: SubjectId,
    found:    SubjectId,
  },

  #[error("token expired {age_ms} ms after issue")]
  Expired { age_ms: i64 },

  #[error("no token presented")]
  MissingToken,

  #[error("token is stale or forged")]
  StaleOrForgedToken,

  /// Key material of the wrong size. Raised only while building a codec.
  #[error("{name} must be {expected} bytes, got {actual}")]
  KeyLength {
    name:     &'static str,
    expected: usize,
    actual:   usize,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Map a backend error from an [`IdentityStore`](crate::store::IdentityStore).
  /// A write rejected by a unique column becomes [`Error::Conflict`]; any
  /// other failure is wrapped as [`Error::Store`].
  pub fn store<E: StoreError>(e: E) -> Self {
    match e.unique_violation() {
      Some(field) => Self::Conflict { field, prior: None },
      None => Self::Store(Box::new(e)),
    }
  }

  /// Short, stable name of the failure kind, for logs.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::InvalidRequest(_) => "invalid_request",
      Self::Conflict { .. } => "conflict",
      Self::NotFound(_) => "not_found",
      Self::BadCredential(_) => "bad_credential",
      Self::ForbiddenMutation(_) => "forbidden_mutation",
      Self::MalformedToken(_) => "malformed_token",
      Self::SubjectMismatch { .. } => "subject_mismatch",
      Self::Expired { .. } => "expired",
      Self::MissingToken => "missing_token",
      Self::StaleOrForgedToken => "stale_or_forged_token",
      Self::KeyLength { .. } => "key_length",
      Self::Store(_) => "store",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
