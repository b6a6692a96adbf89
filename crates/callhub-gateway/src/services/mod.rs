//! Built-in services.
//!
//! `Biz` answers plain request/response calls; `Admin` names the two
//! subscription streams served by the transport layer.

pub mod admin;
pub mod biz;

pub use biz::BizService;
