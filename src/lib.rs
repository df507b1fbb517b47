//! Drygate - Model permissions for Axum REST APIs
//!
//! Models declare global checks (about the request) and object checks
//! (about a request and an instance) per action, with `read` and `write`
//! as fallbacks. On top of that table the crate provides:
//!
//! - [`gate::PermissionGate`] and its middleware, allowing or denying requests
//! - [`field::PermissionsField`], reporting per-object permissions in responses
//! - [`filter::FilterRouter`], restricting what list requests return
//! - [`decorators`] for the usual staff / authenticated shortcuts

#![allow(missing_docs)]

pub mod action;
pub mod checks;
pub mod config;
pub mod decorators;
pub mod environment;
pub mod error;
pub mod field;
pub mod filter;
pub mod gate;
pub mod prelude;
pub mod request;
pub mod setup_tracing;
pub mod table;
pub mod view;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
