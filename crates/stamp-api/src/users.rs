//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users/register` | Body: `{"handle","contact","secret","role"?}` |
//! | `POST` | `/users/login` | Body: `{"subject_id","secret"}` |
//! | `POST` | `/users/update` | Body: `{"subject_id","secret","role"?,"handle"?,"contact"?,"token"?}` |
//! | `POST` | `/users/work` | Body: `{"subject_id","token"?}`; returns the rotated token |
//! | `POST` | `/users/delete/:id` | Body: the acting administrator's `{"subject_id","secret"}` |
//! | `GET`  | `/users` | |
//! | `GET`  | `/users/:id` | 404 if not found |
//! | `GET`  | `/users/search` | `?handle=<fragment>` |
//!
//! Only the mutations that issue a token return it, to the caller that earned
//! it. Reads return [`UserView`], which has no token.

use std::{str::FromStr as _, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stamp_core::{
  Error, IdentityService,
  identity::{Identity, ProfileUpdate, Registration, Role, SubjectId},
  store::IdentityStore,
};

use crate::error::ApiError;

type Service<S> = State<Arc<IdentityService<S>>>;

/// Roles travel as their lowercase names. Absent means `standard`.
fn parse_role(role: Option<&str>) -> Result<Role, ApiError> {
  let Some(name) = role else {
    return Ok(Role::Standard);
  };
  Role::from_str(name).map_err(|_| {
    tracing::warn!(role = name, kind = "invalid_request", "unknown role");
    ApiError::Rejected(Error::InvalidRequest(format!("unknown role {name:?}")))
  })
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub subject_id: Option<SubjectId>,
  pub handle:     String,
  pub contact:    String,
  pub secret:     String,
  pub role:       Option<String>,
  pub token:      Option<String>,
}

/// `POST /users/register`
pub async fn register<S: IdentityStore + 'static>(
  State(service): Service<S>,
  Json(body): Json<RegisterBody>,
) -> Result<Json<Identity>, ApiError> {
  let role = parse_role(body.role.as_deref())?;
  let identity = service
    .register(Registration {
      subject_id: body.subject_id,
      handle: body.handle,
      contact: body.contact,
      secret: body.secret,
      role,
      token: body.token,
    })
    .await?;
  Ok(Json(identity))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CredentialBody {
  pub subject_id: SubjectId,
  pub secret:     String,
}

/// `POST /users/login`
pub async fn login<S: IdentityStore + 'static>(
  State(service): Service<S>,
  Json(body): Json<CredentialBody>,
) -> Result<Json<Identity>, ApiError> {
  Ok(Json(service.login(body.subject_id, &body.secret).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub subject_id: SubjectId,
  pub secret:     String,
  pub role:       Option<String>,
  pub handle:     Option<String>,
  pub contact:    Option<String>,
  pub token:      Option<String>,
}

/// `POST /users/update`
pub async fn update<S: IdentityStore + 'static>(
  State(service): Service<S>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Identity>, ApiError> {
  let role = parse_role(body.role.as_deref())?;
  let identity = service
    .update_profile(ProfileUpdate {
      subject_id: body.subject_id,
      secret: body.secret,
      role,
      handle: body.handle,
      contact: body.contact,
      token: body.token,
    })
    .await?;
  Ok(Json(identity))
}

// ─── Heartbeat ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HeartbeatBody {
  pub subject_id: SubjectId,
  pub token:      Option<String>,
}

/// `POST /users/work` — body: `{"subject_id":1,"token":"…"}`
pub async fn heartbeat<S: IdentityStore + 'static>(
  State(service): Service<S>,
  Json(body): Json<HeartbeatBody>,
) -> Result<Json<Value>, ApiError> {
  let token = service
    .heartbeat(body.subject_id, body.token.as_deref())
    .await?;
  Ok(Json(json!({ "token": token })))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `POST /users/delete/:id` — body names the acting administrator.
pub async fn delete<S: IdentityStore + 'static>(
  State(service): Service<S>,
  Path(id): Path<i64>,
  Json(acting): Json<CredentialBody>,
) -> Result<Json<Value>, ApiError> {
  let target = SubjectId(id);
  service
    .delete(target, acting.subject_id, &acting.secret)
    .await?;
  Ok(Json(json!({ "deleted": target })))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// A record as returned by the read endpoints.
#[derive(Debug, Serialize)]
pub struct UserView {
  pub subject_id: SubjectId,
  pub handle:     String,
  pub contact:    String,
  pub role:       Role,
}

impl From<Identity> for UserView {
  fn from(identity: Identity) -> Self {
    Self {
      subject_id: identity.subject_id,
      handle:     identity.handle,
      contact:    identity.contact,
      role:       identity.role,
    }
  }
}

fn views(identities: Vec<Identity>) -> Vec<UserView> {
  identities.into_iter().map(UserView::from).collect()
}

/// `GET /users`
pub async fn list<S: IdentityStore + 'static>(
  State(service): Service<S>,
) -> Result<Json<Vec<UserView>>, ApiError> {
  let identities = service.list().await.map_err(ApiError::Store)?;
  Ok(Json(views(identities)))
}

/// `GET /users/:id`
pub async fn get_one<S: IdentityStore + 'static>(
  State(service): Service<S>,
  Path(id): Path<i64>,
) -> Result<Json<UserView>, ApiError> {
  match service.get(SubjectId(id)).await {
    Ok(identity) => Ok(Json(identity.into())),
    Err(Error::NotFound(id)) => Err(ApiError::NotFound(format!("subject {id} not found"))),
    Err(e) => Err(ApiError::Store(e)),
  }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  #[serde(default)]
  pub handle: String,
}

/// `GET /users/search?handle=<fragment>`
pub async fn search<S: IdentityStore + 'static>(
  State(service): Service<S>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserView>>, ApiError> {
  let identities = service
    .search(&params.handle)
    .await
    .map_err(ApiError::Store)?;
  Ok(Json(views(identities)))
}
