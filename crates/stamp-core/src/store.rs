//! The `IdentityStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `stamp-store-sqlite`).
//! [`IdentityService`](crate::service::IdentityService) depends on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use crate::identity::{Identity, NewIdentity, SubjectId, UniqueField};

/// Error type of an [`IdentityStore`] backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The unique column a rejected write collided with, when that is why the
  /// write failed.
  fn unique_violation(&self) -> Option<UniqueField> { None }
}

/// Abstraction over a Stamp identity store backend.
///
/// Each call is a single round trip; the store never retries. All methods
/// return `Send` futures so the trait can be used in multi-threaded async
/// runtimes (e.g. tokio with `axum`).
pub trait IdentityStore: Send + Sync {
  type Error: StoreError;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a record by id. Returns `None` if not found.
  fn get(
    &self,
    id: SubjectId,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Exact match on `handle`.
  fn find_by_handle<'a>(
    &'a self,
    handle: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Exact match on `contact`.
  fn find_by_contact<'a>(
    &'a self,
    contact: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// All records, ascending by id.
  fn list(
    &self,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + '_;

  /// Records whose handle contains `fragment`, ascending by id.
  fn search_handle<'a>(
    &'a self,
    fragment: &'a str,
  ) -> impl Future<Output = Result<Vec<Identity>, Self::Error>> + Send + 'a;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert a new record with no token. The store assigns a fresh id that
  /// has never been used before, even by a deleted record.
  fn insert(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Insert a new record together with its first token, as one atomic
  /// write. `issue_token` receives the assigned id; if the write fails no
  /// record is left behind.
  fn insert_with_token<F>(
    &self,
    input: NewIdentity,
    issue_token: F,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_
  where
    F: FnOnce(SubjectId) -> String + Send + 'static;

  /// Overwrite every mutable column of an existing record, unconditionally.
  fn save(
    &self,
    identity: Identity,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Overwrite an existing record only if its stored token still equals
  /// `expected_token`, as one atomic write.
  ///
  /// Returns `None` when the stored token differs (someone rotated first) or
  /// the record no longer exists; nothing is written in that case.
  fn save_if_token(
    &self,
    identity: Identity,
    expected_token: String,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Destroy a record. Returns `false` if there was nothing to delete.
  fn delete(
    &self,
    id: SubjectId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
