//! Transport layer (HTTP for unary calls, WebSocket for server push).
//!
//! Both paths extract the call identity the same way and hand it to the
//! interceptor before any handler runs.

pub mod error;
pub mod rpc;
pub mod ws;

use std::net::SocketAddr;

use axum::http::HeaderMap;

use crate::dispatch::CallMeta;

/// Request header carrying the consumer identity.
pub const CONSUMER_HEADER: &str = "consumer";

/// First `consumer` header value; non-UTF-8 counts as absent.
pub fn consumer_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONSUMER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn call_meta(headers: &HeaderMap, method: impl Into<String>, peer: SocketAddr) -> CallMeta {
    CallMeta::new(consumer_from_headers(headers), method, peer.to_string())
}
