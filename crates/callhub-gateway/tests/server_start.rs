#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use callhub_gateway::server;

const ACL: &str = r#"{"biz_user": ["Biz/Check", "Biz/Add"], "biz_admin": ["Biz/*"]}"#;

#[tokio::test]
async fn start_rejects_malformed_acl_and_listen_address() {
    let token = CancellationToken::new();

    let err = server::start("127.0.0.1:0", "{not json", token.clone()).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "CONFIG_INVALID");

    let err = server::start("127.0.0.1:0", r#"{"a": ["bad pattern"]}"#, token.clone()).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "CONFIG_INVALID");

    let err = server::start("not-an-addr", ACL, token).await.unwrap_err();
    assert_eq!(err.client_code().as_str(), "CONFIG_INVALID");
}

#[tokio::test]
async fn start_serves_until_cancelled() {
    let token = CancellationToken::new();
    let addr = server::start("127.0.0.1:0", ACL, token.clone()).await.unwrap();

    TcpStream::connect(addr).await.expect("listener is up");

    token.cancel();

    // the listener goes away once graceful shutdown completes
    let mut closed = false;
    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_err() {
            closed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(closed, "listener still accepting after cancel");
}
