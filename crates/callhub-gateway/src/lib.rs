//! callhub gateway library entry.
//!
//! This crate wires the ACL policy, the call interceptor, the telemetry hub
//! (log fan-out and statistics), the built-in services and the axum
//! transport into one server. It is consumed by the binary (`main.rs`) and
//! by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod hub;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod router;
pub mod server;
pub mod services;
pub mod transport;
