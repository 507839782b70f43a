//! Business rules checked before a write commits.

use crate::{
  Error, Result,
  identity::{Identity, Registration, Role, SubjectId, UniqueField},
  store::IdentityStore,
};

/// A new record must not choose its own id, role or token.
pub fn check_registration(req: &Registration) -> Result<()> {
  if let Some(id) = req.subject_id
    && !id.is_unassigned()
  {
    return Err(Error::InvalidRequest(format!("new record cannot carry id {id}")));
  }
  if req.role != Role::Standard {
    return Err(Error::InvalidRequest(format!(
      "new record must have role {}, got {}",
      Role::Standard,
      req.role
    )));
  }
  if req.token.as_deref().is_some_and(|t| !t.is_empty()) {
    return Err(Error::InvalidRequest("new record cannot carry a token".into()));
  }
  Ok(())
}

pub fn check_role_unchanged(stored: &Identity, proposed: Role) -> Result<()> {
  if stored.role != proposed {
    return Err(Error::ForbiddenMutation(format!(
      "role of subject {} cannot change from {} to {}",
      stored.subject_id, stored.role, proposed
    )));
  }
  Ok(())
}

/// Fail with [`Error::Conflict`] if `handle` or `contact` already belongs to
/// a record other than `owner`. Empty values are not checked.
pub async fn check_unique<S: IdentityStore>(
  store: &S,
  handle: &str,
  contact: &str,
  owner: Option<SubjectId>,
) -> Result<()> {
  let taken = |found: Option<Identity>| {
    found.is_some_and(|other| Some(other.subject_id) != owner)
  };

  if !handle.is_empty() && taken(store.find_by_handle(handle).await.map_err(Error::store)?) {
    return Err(Error::Conflict { field: UniqueField::Handle, prior: None });
  }
  if !contact.is_empty() && taken(store.find_by_contact(contact).await.map_err(Error::store)?) {
    return Err(Error::Conflict { field: UniqueField::Contact, prior: None });
  }
  Ok(())
}

/// Resolve the acting principal of a deletion and check it may delete.
///
/// Only role and credential are checked; no token is involved.
pub async fn authorize_deletion<S: IdentityStore>(
  store: &S,
  acting: SubjectId,
  acting_secret: &str,
) -> Result<Identity> {
  let actor = store
    .get(acting)
    .await
    .map_err(Error::store)?
    .ok_or(Error::NotFound(acting))?;

  if !actor.is_privileged() {
    return Err(Error::ForbiddenMutation(format!(
      "subject {acting} is not an {}",
      Role::Administrator
    )));
  }
  if !actor.secret_matches(acting_secret) {
    return Err(Error::ForbiddenMutation(format!(
      "credential mismatch for acting subject {acting}"
    )));
  }
  Ok(actor)
}
