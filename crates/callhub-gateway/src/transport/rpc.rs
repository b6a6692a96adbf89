//! Unary RPC over HTTP: `POST /rpc/{service}/{method}`.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use callhub_core::error::{HubError, Result};

use crate::app_state::AppState;
use crate::dispatch::CallShape;
use crate::transport::{call_meta, error::ErrorResponse};

fn parse_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| HubError::BadRequest(format!("invalid json body: {e}")))
}

pub async fn unary(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path((service, method)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let meta = call_meta(&headers, format!("{service}/{method}"), peer);
    let dispatcher = app.dispatcher();

    let result = app
        .interceptor()
        .intercept(CallShape::Unary, meta, |meta| async move {
            let req = parse_body(&body)?;
            dispatcher.dispatch_unary(&meta, req).await
        })
        .await;

    match result {
        Ok(v) => Json(v).into_response(),
        Err(e) => ErrorResponse(e).into_response(),
    }
}
