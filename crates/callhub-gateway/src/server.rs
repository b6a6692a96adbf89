//! Listener lifecycle.
//!
//! `serve` runs until the shutdown token is cancelled, then shuts the hub
//! down (ending every push stream and timer) and lets axum drain.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use callhub_core::error::{HubError, Result};

use crate::app_state::AppState;
use crate::config::HubConfig;
use crate::policy::acl_map_from_json;
use crate::router;

pub async fn bind(listen: &str) -> Result<TcpListener> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| HubError::ConfigInvalid(format!("hub.listen must be a valid SocketAddr: {e}")))?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| HubError::Internal(format!("failed to bind {addr}: {e}")))
}

/// Serve `state` on `listener` until `shutdown` is cancelled.
pub async fn serve_on(listener: TcpListener, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let hub = state.hub();
    let app = router::build_router(state);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            hub.shutdown();
        })
        .await
        .map_err(|e| HubError::Internal(format!("server failed: {e}")))
}

pub async fn serve(cfg: HubConfig, shutdown: CancellationToken) -> Result<()> {
    let listener = bind(&cfg.hub.listen).await?;
    let state = AppState::new(cfg)?;
    if let Ok(local) = listener.local_addr() {
        tracing::info!(listen = %local, "callhub-gateway starting");
    }
    serve_on(listener, state, shutdown).await
}

/// Parse the ACL blob, bind `listen`, and serve in the background until
/// `shutdown` is cancelled. Returns the bound address.
pub async fn start(listen: &str, acl_json: &str, shutdown: CancellationToken) -> Result<SocketAddr> {
    let mut cfg = HubConfig::with_acl(acl_map_from_json(acl_json)?);
    cfg.hub.listen = listen.to_string();
    cfg.validate()?;

    let state = AppState::new(cfg)?;
    let listener = bind(listen).await?;
    let local = listener
        .local_addr()
        .map_err(|e| HubError::Internal(format!("local_addr failed: {e}")))?;

    tokio::spawn(async move {
        if let Err(e) = serve_on(listener, state, shutdown).await {
            tracing::error!(error = %e, "callhub server stopped with error");
        }
    });

    Ok(local)
}
