//! callhub gateway
//!
//! - `POST /rpc/{service}/{method}` with a `consumer` header
//! - `GET /rpc/Admin/Logging` and `/rpc/Admin/Statistics?interval_seconds=N` (WebSocket)
//! - SIGINT/SIGTERM stop the listener and every subscriber task

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use callhub_gateway::{config, server};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "callhub.yaml".to_string());
    let cfg = match config::load_from_file(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "config load failed");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    if let Err(e) = server::serve(cfg, shutdown).await {
        tracing::error!(error = %e, "callhub-gateway failed");
        std::process::exit(1);
    }
    tracing::info!("callhub-gateway stopped");
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
    token.cancel();
}
