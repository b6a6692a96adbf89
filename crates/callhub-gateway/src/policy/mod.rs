//! Policy layer (per-consumer method ACL).
//!
//! Compiles the ACL configuration once at startup into lookup structures the
//! call interceptor consults on every call.

pub mod acl_store;

pub use acl_store::{acl_map_from_json, AclStore};
