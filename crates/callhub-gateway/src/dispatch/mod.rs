//! Dispatcher module exports.
//!
//! Re-exports the interceptor, the dispatcher and the service trait so
//! downstream consumers can depend on this module directly.

pub mod dispatcher;
pub mod interceptor;

pub use dispatcher::{split_method, Dispatcher, UnaryService};
pub use interceptor::{CallInterceptor, CallMeta, CallShape};
