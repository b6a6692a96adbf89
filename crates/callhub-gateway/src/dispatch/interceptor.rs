//! Call interceptor: the single gate every RPC passes through.
//!
//! Per call: authorize -> publish event -> record statistics -> run handler.
//! A rejected call has no side effects and never reaches its handler; an
//! admitted call gets its handler's result back untouched.

use std::future::Future;
use std::sync::Arc;

use callhub_core::error::Result;
use callhub_core::CallEvent;

use crate::hub::Hub;
use crate::policy::AclStore;

/// Identity of one inbound call as handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMeta {
    /// `None` when the caller sent no consumer metadata.
    pub consumer: Option<String>,
    /// Fully-qualified method name, e.g. `Biz/Check`.
    pub method: String,
    /// Peer address (`ip:port`).
    pub host: String,
}

impl CallMeta {
    pub fn new(consumer: Option<String>, method: impl Into<String>, host: impl Into<String>) -> Self {
        Self { consumer, method: method.into(), host: host.into() }
    }

    pub fn consumer(&self) -> Option<&str> {
        self.consumer.as_deref()
    }
}

/// Shape of the intercepted call. Both shapes share the gate; a stream is
/// gated once, when it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    Unary,
    ServerStream,
}

impl CallShape {
    pub fn as_str(self) -> &'static str {
        match self {
            CallShape::Unary => "unary",
            CallShape::ServerStream => "server_stream",
        }
    }
}

pub struct CallInterceptor {
    acl: Arc<AclStore>,
    hub: Arc<Hub>,
}

impl CallInterceptor {
    pub fn new(acl: Arc<AclStore>, hub: Arc<Hub>) -> Self {
        Self { acl, hub }
    }

    /// Authorize, then publish and record in that order.
    pub async fn admit(&self, shape: CallShape, meta: &CallMeta) -> Result<()> {
        let metrics = self.hub.metrics();

        if let Err(e) = self.acl.authorize(meta.consumer(), &meta.method) {
            let outcome = e.client_code().as_str().to_ascii_lowercase();
            metrics.calls.inc(&[("outcome", outcome.as_str())]);
            tracing::debug!(
                consumer = meta.consumer().unwrap_or(""),
                method = %meta.method,
                shape = shape.as_str(),
                code = e.client_code().as_str(),
                "call rejected"
            );
            return Err(e);
        }

        metrics.calls.inc(&[("outcome", "accepted")]);

        // authorize() guarantees a non-empty consumer past this point
        let consumer = meta.consumer().unwrap_or_default();
        let event = CallEvent::new(consumer, meta.method.as_str(), meta.host.as_str());
        self.hub.broadcaster().publish(&event).await;
        self.hub.stats().record(consumer, &meta.method);

        Ok(())
    }

    /// Gate and observe `handler`; its result is returned verbatim.
    pub async fn intercept<T, F, Fut>(&self, shape: CallShape, meta: CallMeta, handler: F) -> Result<T>
    where
        F: FnOnce(CallMeta) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.admit(shape, &meta).await?;
        handler(meta).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use callhub_core::HubError;

    use crate::config::HubSection;
    use crate::obs::HubMetrics;

    fn fixture() -> (CallInterceptor, Arc<Hub>) {
        let acl = AclStore::from_json(r#"{"biz_user": ["Check", "Add"]}"#).unwrap();
        let hub = Arc::new(Hub::new(&HubSection::default(), Arc::new(HubMetrics::default())));
        (CallInterceptor::new(Arc::new(acl), Arc::clone(&hub)), hub)
    }

    #[tokio::test(start_paused = true)]
    async fn authorized_call_is_broadcast_counted_and_dispatched() {
        let (icpt, hub) = fixture();
        let mut log = hub.broadcaster().subscribe().unwrap();
        let stats = hub.stats().subscribe(Duration::from_secs(1)).unwrap();

        let meta = CallMeta::new(Some("biz_user".into()), "Biz/Check", "127.0.0.1:4242");
        let out = icpt
            .intercept(CallShape::Unary, meta, |m| async move { Ok(m.method) })
            .await
            .unwrap();
        assert_eq!(out, "Biz/Check");

        let ev = log.try_recv().unwrap();
        assert_eq!((ev.consumer.as_str(), ev.method.as_str(), ev.host.as_str()), ("biz_user", "Biz/Check", "127.0.0.1:4242"));

        let snap = hub.stats().flush_now(stats.id()).unwrap();
        assert_eq!(snap.by_method.get("Biz/Check"), Some(&1));
        assert_eq!(snap.by_consumer.get("biz_user"), Some(&1));
        assert_eq!(hub.metrics().calls.get(&[("outcome", "accepted")]), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_call_has_no_side_effects() {
        let (icpt, hub) = fixture();
        let mut log = hub.broadcaster().subscribe().unwrap();
        let stats = hub.stats().subscribe(Duration::from_secs(1)).unwrap();
        let ran = AtomicBool::new(false);

        let cases = [
            (None, "Biz/Check", "UNAUTHENTICATED"),
            (Some("nobody".to_string()), "Biz/Check", "UNAUTHENTICATED"),
            (Some("biz_user".to_string()), "Biz/Test", "FORBIDDEN"),
        ];
        for (consumer, method, code) in cases {
            let err = icpt
                .intercept(CallShape::Unary, CallMeta::new(consumer, method, "h"), |_| async {
                    ran.store(true, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .expect_err("must reject");
            assert_eq!(err.client_code().as_str(), code);
        }

        assert!(!ran.load(Ordering::SeqCst));
        assert!(log.try_recv().is_none());
        assert_eq!(hub.stats().flush_now(stats.id()).unwrap().total(), 0);
        assert_eq!(hub.metrics().calls.get(&[("outcome", "forbidden")]), 1);
    }

    #[tokio::test]
    async fn handler_errors_pass_through_untouched() {
        let (icpt, _hub) = fixture();
        let meta = CallMeta::new(Some("biz_user".into()), "Biz/Add", "h");
        let err = icpt
            .intercept(CallShape::ServerStream, meta, |_| async {
                Err::<(), _>(HubError::Internal("boom".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err, HubError::Internal("boom".into()));
    }
}
