//! Server-push streams over WebSocket.
//!
//! Responsibilities:
//! - Gate the stream once, before the upgrade (a rejected stream is never
//!   upgraded and gets a plain HTTP error)
//! - Register the subscription at open time so nothing published during the
//!   handshake is missed
//! - Push one JSON text frame per item until the client goes away, the socket
//!   fails, or the hub shuts down
//! - Drop the subscription on exit, which unregisters it

use std::net::SocketAddr;

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, ConnectInfo, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use callhub_core::error::HubError;

use crate::app_state::AppState;
use crate::dispatch::CallShape;
use crate::hub::PushSource;
use crate::services::admin;
use crate::transport::{call_meta, error::ErrorResponse};

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    #[serde(default)]
    pub interval_seconds: Option<String>,
}

// --------------------
// Entry
// --------------------
pub async fn logging_upgrade(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let meta = call_meta(&headers, admin::LOGGING, peer);
    let hub = app.hub();

    let result = app
        .interceptor()
        .intercept(CallShape::ServerStream, meta, |_| async move {
            let sub = admin::open_logging(&hub)?;
            let shutdown = hub.shutdown_token();
            Ok(ws.on_upgrade(move |socket| run_push_session(socket, sub, shutdown)))
        })
        .await;

    result.unwrap_or_else(|e| ErrorResponse(e).into_response())
}

pub async fn statistics_upgrade(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(q): Query<StatisticsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let meta = call_meta(&headers, admin::STATISTICS, peer);
    let hub = app.hub();

    let result = app
        .interceptor()
        .intercept(CallShape::ServerStream, meta, |_| async move {
            let sub = admin::open_statistics(&hub, q.interval_seconds.as_deref())?;
            let shutdown = hub.shutdown_token();
            Ok(ws.on_upgrade(move |socket| run_push_session(socket, sub, shutdown)))
        })
        .await;

    result.unwrap_or_else(|e| ErrorResponse(e).into_response())
}

// --------------------
// Push loop
// --------------------
async fn run_push_session<S>(socket: WebSocket, mut source: S, shutdown: CancellationToken)
where
    S: PushSource,
{
    let sub_id = source.id();
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            item = source.next_item() => {
                let Some(item) = item else { break; };
                let text = match serde_json::to_string(&item) {
                    Ok(t) => t,
                    Err(e) => {
                        tracing::warn!(sub_id, error = %e, "push item encode failed; skipping");
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(Message::Text(text)).await {
                    let err = HubError::TransportFailure(e.to_string());
                    tracing::warn!(sub_id, error = %err, "push stream write failed");
                    break;
                }
            }

            // the client never sends data; any end of the read half ends the call
            incoming = ws_rx.next() => {
                match incoming {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                }
            }

            _ = shutdown.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::debug!(sub_id, "push stream ended");
    drop(source);
}
