//! [`SqliteStore`] — the SQLite implementation of [`IdentityStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, types::Value};

use stamp_core::{
  identity::{Identity, NewIdentity, SubjectId, UniqueField},
  store::IdentityStore,
};

use crate::{
  Error, Result,
  encode::RawIdentity,
  schema::{COLUMNS, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Stamp identity store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls
/// are serialised on the connection's thread, so each statement below is
/// atomic with respect to every other caller.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::info!(?path, "identity store opened");
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Select at most one row matching `filter` (a `WHERE` body using `?1`).
  async fn query_one(&self, filter: &'static str, value: Value) -> Result<Option<Identity>> {
    let sql = format!("SELECT {COLUMNS} FROM identities WHERE {filter}");

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![value], RawIdentity::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  /// Select every row matching `filter` (empty, or a full `WHERE` clause),
  /// ascending by id.
  async fn query_many(&self, filter: &'static str, params: Vec<Value>) -> Result<Vec<Identity>> {
    let sql = format!("SELECT {COLUMNS} FROM identities {filter} ORDER BY subject_id");

    let raws: Vec<RawIdentity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawIdentity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIdentity::into_identity).collect()
  }

  /// Write the mutable columns of `identity`, optionally only when the
  /// stored token equals `expected_token`. Returns the affected row count.
  async fn update(&self, identity: &Identity, expected_token: Option<String>) -> Result<usize> {
    let id_val    = identity.subject_id.0;
    let handle    = identity.handle.clone();
    let contact   = identity.contact.clone();
    let secret    = identity.secret.clone();
    let token     = identity.current_token.clone();

    let changed = self
      .conn
      .call(move |conn| {
        let changed = match expected_token {
          Some(expected) => conn.execute(
            "UPDATE identities
             SET handle = ?1, contact = ?2, secret = ?3, current_token = ?4
             WHERE subject_id = ?5 AND current_token = ?6",
            rusqlite::params![handle, contact, secret, token, id_val, expected],
          )?,
          None => conn.execute(
            "UPDATE identities
             SET handle = ?1, contact = ?2, secret = ?3, current_token = ?4
             WHERE subject_id = ?5",
            rusqlite::params![handle, contact, secret, token, id_val],
          )?,
        };
        Ok(changed)
      })
      .await
      .map_err(classify)?;

    Ok(changed)
  }

  /// Insert a row and, in the same transaction, store the token
  /// `issue_token` returns for the assigned id.
  async fn insert_row<F>(&self, input: NewIdentity, issue_token: F) -> Result<Identity>
  where
    F: FnOnce(SubjectId) -> Option<String> + Send + 'static,
  {
    let handle   = input.handle.clone();
    let contact  = input.contact.clone();
    let secret   = input.secret.clone();
    let role_str = input.role.as_ref().to_owned();

    let (rowid, token) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO identities (handle, contact, secret, role) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![handle, contact, secret, role_str],
        )?;
        let rowid = tx.last_insert_rowid();
        let token = issue_token(SubjectId(rowid));
        if let Some(token) = &token {
          tx.execute(
            "UPDATE identities SET current_token = ?1 WHERE subject_id = ?2",
            rusqlite::params![token, rowid],
          )?;
        }
        tx.commit()?;
        Ok((rowid, token))
      })
      .await
      .map_err(classify)?;

    Ok(Identity {
      subject_id:    SubjectId(rowid),
      handle:        input.handle,
      contact:       input.contact,
      secret:        input.secret,
      role:          input.role,
      current_token: token,
    })
  }
}

/// Map a unique-index collision to [`Error::Duplicate`]; pass anything else
/// through.
fn classify(e: tokio_rusqlite::Error) -> Error {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, Some(msg))) = &e
    && failure.code == rusqlite::ErrorCode::ConstraintViolation
  {
    // SQLite names the column: "UNIQUE constraint failed: identities.handle".
    if msg.contains("identities.handle") {
      return Error::Duplicate(UniqueField::Handle);
    }
    if msg.contains("identities.contact") {
      return Error::Duplicate(UniqueField::Contact);
    }
  }
  Error::Database(e)
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get(&self, id: SubjectId) -> Result<Option<Identity>> {
    self.query_one("subject_id = ?1", Value::Integer(id.0)).await
  }

  async fn find_by_handle(&self, handle: &str) -> Result<Option<Identity>> {
    self.query_one("handle = ?1", Value::Text(handle.to_owned())).await
  }

  async fn find_by_contact(&self, contact: &str) -> Result<Option<Identity>> {
    self.query_one("contact = ?1", Value::Text(contact.to_owned())).await
  }

  async fn list(&self) -> Result<Vec<Identity>> {
    self.query_many("", Vec::new()).await
  }

  async fn search_handle(&self, fragment: &str) -> Result<Vec<Identity>> {
    // instr() rather than LIKE: no wildcard escaping, case-sensitive.
    self
      .query_many("WHERE instr(handle, ?1) > 0", vec![Value::Text(fragment.to_owned())])
      .await
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert(&self, input: NewIdentity) -> Result<Identity> {
    self.insert_row(input, |_| None).await
  }

  async fn insert_with_token<F>(&self, input: NewIdentity, issue_token: F) -> Result<Identity>
  where
    F: FnOnce(SubjectId) -> String + Send + 'static,
  {
    self.insert_row(input, move |id| Some(issue_token(id))).await
  }

  async fn save(&self, identity: Identity) -> Result<Identity> {
    if self.update(&identity, None).await? == 0 {
      return Err(Error::SubjectNotFound(identity.subject_id));
    }
    Ok(identity)
  }

  async fn save_if_token(
    &self,
    identity:       Identity,
    expected_token: String,
  ) -> Result<Option<Identity>> {
    let changed = self.update(&identity, Some(expected_token)).await?;
    Ok((changed == 1).then_some(identity))
  }

  async fn delete(&self, id: SubjectId) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM identities WHERE subject_id = ?1",
          rusqlite::params![id.0],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }
}
