//! Top-level facade crate for callhub.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use callhub_core::*;
}

pub mod gateway {
    pub use callhub_gateway::*;
}
