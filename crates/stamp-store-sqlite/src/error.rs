//! Error type for `stamp-store-sqlite`.

use stamp_core::{
  identity::{SubjectId, UniqueField},
  store::StoreError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A write collided with the unique index on `handle` or `contact`.
  #[error("{0} already in use")]
  Duplicate(UniqueField),

  #[error("unknown role in row: {0:?}")]
  UnknownRole(String),

  /// An unconditional save targeted a row that does not exist.
  #[error("subject not found: {0}")]
  SubjectNotFound(SubjectId),
}

impl StoreError for Error {
  fn unique_violation(&self) -> Option<UniqueField> {
    match self {
      Self::Duplicate(field) => Some(*field),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
