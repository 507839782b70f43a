//! Core types and the token-gated mutation protocol for Stamp.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::IdentityStore`]; transports drive
//! [`service::IdentityService`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod gate;
pub mod identity;
pub mod invariants;
pub mod service;
pub mod store;
pub mod token;
pub mod validator;

pub use error::{Error, Result};
pub use service::IdentityService;
