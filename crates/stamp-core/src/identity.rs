//! Identity records and the request shapes that create or change them.

use std::fmt;

use constant_time_eq::constant_time_eq;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Stable numeric identifier of a subject, assigned by the store on insert.
///
/// Zero is the "unassigned" sentinel accepted in registration requests.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubjectId(pub i64);

impl SubjectId {
  pub fn is_unassigned(self) -> bool { self.0 == 0 }
}

impl fmt::Display for SubjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// The closed set of roles. Fixed at creation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Standard,
  Administrator,
}

/// A column that must be unique across all identity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum UniqueField {
  Handle,
  Contact,
}

/// One principal.
///
/// `current_token` is a single-slot version stamp: the only token that will
/// be accepted as proof of freshness for this subject.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
  pub subject_id:    SubjectId,
  pub handle:        String,
  pub contact:       String,
  #[serde(skip_serializing)]
  pub secret:        String,
  pub role:          Role,
  pub current_token: Option<String>,
}

impl Identity {
  /// Byte-for-byte comparison against the stored secret. An empty
  /// presentation never matches.
  pub fn secret_matches(&self, presented: &str) -> bool {
    !presented.is_empty()
      && constant_time_eq(presented.as_bytes(), self.secret.as_bytes())
  }

  pub fn is_privileged(&self) -> bool { self.role == Role::Administrator }
}

impl fmt::Debug for Identity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Identity")
      .field("subject_id", &self.subject_id)
      .field("handle", &self.handle)
      .field("contact", &self.contact)
      .field("secret", &"<redacted>")
      .field("role", &self.role)
      .field("has_token", &self.current_token.is_some())
      .finish()
  }
}

/// The fields a store needs to insert a record. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub handle:  String,
  pub contact: String,
  pub secret:  String,
  pub role:    Role,
}

/// A registration request as it arrives from the transport.
///
/// `subject_id` and `token` must be absent (or the zero id); they exist so
/// that a client trying to choose its own id or token can be rejected.
#[derive(Debug, Clone)]
pub struct Registration {
  pub subject_id: Option<SubjectId>,
  pub handle:     String,
  pub contact:    String,
  pub secret:     String,
  pub role:       Role,
  pub token:      Option<String>,
}

/// A profile update.
///
/// An absent or blank `handle` / `contact` keeps the stored value instead of
/// being written through, so an update can never clear either column. This
/// deliberately departs from write-as-given semantics.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
  pub subject_id: SubjectId,
  pub secret:     String,
  pub role:       Role,
  pub handle:     Option<String>,
  pub contact:    Option<String>,
  pub token:      Option<String>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  fn alice() -> Identity {
    Identity {
      subject_id:    SubjectId(1),
      handle:        "alice".into(),
      contact:       "a@x.com".into(),
      secret:        "p1".into(),
      role:          Role::Standard,
      current_token: Some("t".into()),
    }
  }

  #[test]
  fn role_string_forms() {
    assert_eq!(Role::Standard.as_ref(), "standard");
    assert_eq!(Role::from_str("administrator").unwrap(), Role::Administrator);
    assert!(Role::from_str("admin").is_err());
  }

  #[test]
  fn secret_is_compared_exactly() {
    let id = alice();
    assert!(id.secret_matches("p1"));
    assert!(!id.secret_matches("p1 "));
    assert!(!id.secret_matches(""));
  }

  #[test]
  fn secret_never_serialized_or_debug_printed() {
    let id = alice();
    let json = serde_json::to_value(&id).unwrap();
    assert!(json.get("secret").is_none());
    assert_eq!(json["subject_id"], 1);
    assert_eq!(json["role"], "standard");
    assert!(!format!("{id:?}").contains("p1"));
  }
}
