//! [`IdentityService`] — the operations exposed to transports.
//!
//! | Operation | Gate | Token |
//! |-----------|------|-------|
//! | [`register`](IdentityService::register) | creation preconditions + uniqueness | minted |
//! | [`login`](IdentityService::login) | secret | minted unconditionally |
//! | [`update_profile`](IdentityService::update_profile) | secret, role, [`MutationGate`], uniqueness | rotated |
//! | [`heartbeat`](IdentityService::heartbeat) | [`MutationGate`] | rotated |
//! | [`delete`](IdentityService::delete) | privileged actor + its secret | none |
//!
//! Every rejection is logged with its [`Error::kind`] before being returned.

use crate::{
  Error, Result,
  gate::MutationGate,
  identity::{Identity, NewIdentity, ProfileUpdate, Registration, SubjectId},
  invariants,
  store::IdentityStore,
  token::TokenCodec,
  validator::TokenValidator,
};

pub struct IdentityService<S> {
  store: S,
  gate:  MutationGate,
}

impl<S: IdentityStore> IdentityService<S> {
  pub fn new(store: S, codec: TokenCodec) -> Self {
    Self { store, gate: MutationGate::new(TokenValidator::new(codec)) }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn gate(&self) -> &MutationGate { &self.gate }

  // ── Token-issuing operations ──────────────────────────────────────────

  /// Create a record and mint its first token.
  pub async fn register(&self, req: Registration) -> Result<Identity> {
    tracing::info!(handle = %req.handle, contact = %req.contact, "registering subject");
    let outcome = self.try_register(req).await;
    match &outcome {
      Ok(identity) => tracing::info!(subject_id = %identity.subject_id, "registered"),
      Err(e) => tracing::warn!(kind = e.kind(), error = %e, "registration rejected"),
    }
    outcome
  }

  /// Re-authenticate with the stored secret. Always mints a new token,
  /// whatever token the record held before.
  pub async fn login(&self, subject_id: SubjectId, secret: &str) -> Result<Identity> {
    let outcome = self.try_login(subject_id, secret).await;
    log_outcome("login", subject_id, &outcome);
    outcome
  }

  /// Change handle and/or contact.
  ///
  /// On a uniqueness conflict nothing is written: the error carries the
  /// stored record unchanged and the presented token stays active.
  pub async fn update_profile(&self, req: ProfileUpdate) -> Result<Identity> {
    let subject_id = req.subject_id;
    let outcome = self.try_update_profile(req).await;
    log_outcome("profile update", subject_id, &outcome);
    outcome
  }

  /// Prove freshness and receive the rotated token.
  pub async fn heartbeat(&self, subject_id: SubjectId, token: Option<&str>) -> Result<String> {
    let outcome = self.try_heartbeat(subject_id, token).await;
    log_outcome("heartbeat", subject_id, &outcome);
    outcome
  }

  // ── Deletion ──────────────────────────────────────────────────────────

  /// Destroy `target` on behalf of an administrator.
  pub async fn delete(
    &self,
    target: SubjectId,
    acting: SubjectId,
    acting_secret: &str,
  ) -> Result<()> {
    let outcome = self.try_delete(target, acting, acting_secret).await;
    match &outcome {
      Ok(()) => tracing::info!(%target, %acting, "subject deleted"),
      Err(e) => {
        tracing::warn!(%target, %acting, kind = e.kind(), error = %e, "deletion rejected")
      }
    }
    outcome
  }

  /// Operator bootstrap: insert a record with any role, bypassing the
  /// registration preconditions but not uniqueness. No token is minted.
  pub async fn provision(&self, input: NewIdentity) -> Result<Identity> {
    invariants::check_unique(&self.store, &input.handle, &input.contact, None).await?;
    let role = input.role;
    let identity = self.store.insert(input).await.map_err(Error::store)?;
    tracing::info!(subject_id = %identity.subject_id, %role, "subject provisioned");
    Ok(identity)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn get(&self, subject_id: SubjectId) -> Result<Identity> {
    self
      .store
      .get(subject_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(subject_id))
  }

  pub async fn list(&self) -> Result<Vec<Identity>> {
    self.store.list().await.map_err(Error::store)
  }

  /// Records whose handle contains `fragment`.
  pub async fn search(&self, fragment: &str) -> Result<Vec<Identity>> {
    self.store.search_handle(fragment).await.map_err(Error::store)
  }

  // ── Internals ─────────────────────────────────────────────────────────

  async fn try_register(&self, req: Registration) -> Result<Identity> {
    invariants::check_registration(&req)?;
    invariants::check_unique(&self.store, &req.handle, &req.contact, None).await?;

    let validator = self.gate.validator().clone();
    self
      .store
      .insert_with_token(
        NewIdentity {
          handle:  req.handle,
          contact: req.contact,
          secret:  req.secret,
          role:    req.role,
        },
        move |subject_id| validator.mint(subject_id),
      )
      .await
      .map_err(Error::store)
  }

  async fn try_login(&self, subject_id: SubjectId, secret: &str) -> Result<Identity> {
    let mut identity = self.get(subject_id).await?;
    if !identity.secret_matches(secret) {
      return Err(Error::BadCredential(subject_id));
    }
    identity.current_token = Some(self.gate.validator().mint(subject_id));
    self.store.save(identity).await.map_err(Error::store)
  }

  async fn try_update_profile(&self, req: ProfileUpdate) -> Result<Identity> {
    let subject_id = req.subject_id;
    let stored = self.get(subject_id).await?;
    if !stored.secret_matches(&req.secret) {
      return Err(Error::BadCredential(subject_id));
    }
    invariants::check_role_unchanged(&stored, req.role)?;

    let rotation = self.gate.authorize(&stored, req.token.as_deref())?;

    let handle = non_blank(req.handle).unwrap_or_else(|| stored.handle.clone());
    let contact = non_blank(req.contact).unwrap_or_else(|| stored.contact.clone());

    // A collision can surface here or, under a concurrent write, from the
    // store itself. Either way nothing was written.
    invariants::check_unique(&self.store, &handle, &contact, Some(subject_id))
      .await
      .map_err(|e| with_prior(e, &stored))?;

    let updated = Identity { handle, contact, ..stored.clone() };
    self
      .gate
      .commit(&self.store, updated, rotation)
      .await
      .map_err(|e| with_prior(e, &stored))
  }

  async fn try_heartbeat(&self, subject_id: SubjectId, token: Option<&str>) -> Result<String> {
    if token.is_none_or(str::is_empty) {
      return Err(Error::MissingToken);
    }
    let stored = self.get(subject_id).await?;
    let rotation = self.gate.authorize(&stored, token)?;
    let saved = self.gate.commit(&self.store, stored, rotation).await?;
    saved.current_token.ok_or(Error::StaleOrForgedToken)
  }

  async fn try_delete(
    &self,
    target: SubjectId,
    acting: SubjectId,
    acting_secret: &str,
  ) -> Result<()> {
    invariants::authorize_deletion(&self.store, acting, acting_secret).await?;
    self.get(target).await?;
    if !self.store.delete(target).await.map_err(Error::store)? {
      return Err(Error::NotFound(target));
    }
    Ok(())
  }
}

/// Attach the unchanged record to a uniqueness conflict.
fn with_prior(e: Error, stored: &Identity) -> Error {
  match e {
    Error::Conflict { field, .. } => {
      Error::Conflict { field, prior: Some(Box::new(stored.clone())) }
    }
    other => other,
  }
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

fn log_outcome<T>(operation: &'static str, subject_id: SubjectId, outcome: &Result<T>) {
  match outcome {
    Ok(_) => tracing::info!(%subject_id, "{operation} succeeded"),
    Err(e) => {
      tracing::warn!(%subject_id, kind = e.kind(), error = %e, "{operation} rejected")
    }
  }
}
