//! JSON REST API for Stamp.
//!
//! Exposes an axum [`Router`] backed by an [`IdentityService`] over any
//! [`stamp_core::store::IdentityStore`]. TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(stamp_api::api_router(Arc::new(service)))
//! ```

pub mod error;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use stamp_core::{IdentityService, store::IdentityStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: Arc<IdentityService<S>>) -> Router<()>
where
  S: IdentityStore + 'static,
{
  Router::new()
    // Mutations
    .route("/users/register", post(users::register::<S>))
    .route("/users/login", post(users::login::<S>))
    .route("/users/update", post(users::update::<S>))
    .route("/users/work", post(users::heartbeat::<S>))
    .route("/users/delete/{id}", post(users::delete::<S>))
    // Reads
    .route("/users", get(users::list::<S>))
    .route("/users/search", get(users::search::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    .with_state(service)
}
