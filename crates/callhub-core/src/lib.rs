//! callhub core: transport-agnostic primitives shared by the hub runtime.
//!
//! This crate defines the error surface, the ACL pattern compiler and the
//! records pushed to subscribers. It carries no runtime or transport
//! dependencies so the matching logic can be exercised in isolation.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `HubError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod acl;
pub mod error;
pub mod record;

/// Shared result type.
pub use error::{ClientCode, HubError, Result};
pub use record::{CallEvent, ErrorBody, StatCounters, StatSnapshot};
