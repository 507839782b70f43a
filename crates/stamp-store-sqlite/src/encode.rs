//! Encoding and decoding helpers between Stamp domain types and the plain
//! column values stored in SQLite.
//!
//! Roles are stored as their lowercase names (`Role`'s string form). Ids are
//! SQLite rowids.

use std::str::FromStr as _;

use stamp_core::identity::{Identity, Role, SubjectId};

use crate::{Error, Result};

// ─── Role ─────────────────────────────────────────────────────────────────────

pub fn decode_role(s: &str) -> Result<Role> {
  Role::from_str(s).map_err(|_| Error::UnknownRole(s.to_owned()))
}

// ─── Rows ─────────────────────────────────────────────────────────────────────

/// An `identities` row as read, before the role column is validated.
pub struct RawIdentity {
  pub subject_id:    i64,
  pub handle:        String,
  pub contact:       String,
  pub secret:        String,
  pub role:          String,
  pub current_token: Option<String>,
}

impl RawIdentity {
  /// Row mapper for statements selecting [`COLUMNS`](crate::schema::COLUMNS).
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:    row.get(0)?,
      handle:        row.get(1)?,
      contact:       row.get(2)?,
      secret:        row.get(3)?,
      role:          row.get(4)?,
      current_token: row.get(5)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      subject_id:    SubjectId(self.subject_id),
      handle:        self.handle,
      contact:       self.contact,
      secret:        self.secret,
      role:          decode_role(&self.role)?,
      current_token: self.current_token,
    })
  }
}
