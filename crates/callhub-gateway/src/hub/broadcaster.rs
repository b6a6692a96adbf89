use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use callhub_core::error::{HubError, Result};
use callhub_core::CallEvent;

use crate::hub::{PushSource, SubscriptionId};
use crate::obs::HubMetrics;

/// One log subscriber's delivery handle.
#[derive(Clone)]
struct LogSink {
    tx: mpsc::Sender<CallEvent>,
    /// Cancelled on unsubscribe; also aborts a delivery blocked on this sink.
    cancel: CancellationToken,
}

#[derive(Default)]
struct Registry {
    sinks: HashMap<SubscriptionId, LogSink>,
    closed: bool,
}

struct Inner {
    registry: Mutex<Registry>,
    seq: AtomicU64,
    buffer: usize,
    metrics: Arc<HubMetrics>,
}

impl Inner {
    fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.registry.lock().sinks.remove(&id);
        match removed {
            Some(sink) => {
                sink.cancel.cancel();
                self.metrics.subscribers_active.dec(&[("kind", "log")]);
                tracing::info!(sub_id = id, "log subscription closed");
                true
            }
            None => false,
        }
    }
}

/// Fan-out of call events to every live log subscriber.
///
/// The registry lock is held only to add/remove a sink or to snapshot the
/// sink list; delivery happens outside it.
#[derive(Clone)]
pub struct EventBroadcaster {
    inner: Arc<Inner>,
}

impl EventBroadcaster {
    pub fn new(buffer: usize, metrics: Arc<HubMetrics>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::default()),
                seq: AtomicU64::new(1),
                buffer: buffer.max(1),
                metrics,
            }),
        }
    }

    /// Register a new destination. Dropping the returned handle unregisters it.
    pub fn subscribe(&self) -> Result<LogSubscription> {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let cancel = CancellationToken::new();
        let id = self.inner.seq.fetch_add(1, Ordering::Relaxed);

        {
            let mut reg = self.inner.registry.lock();
            if reg.closed {
                return Err(HubError::TransportFailure("hub is shutting down".into()));
            }
            reg.sinks.insert(id, LogSink { tx, cancel: cancel.clone() });
        }

        self.inner.metrics.subscribers_active.inc(&[("kind", "log")]);
        tracing::info!(sub_id = id, "log subscription opened");

        Ok(LogSubscription {
            id,
            rx,
            cancel,
            owner: Arc::downgrade(&self.inner),
        })
    }

    /// Idempotent; returns whether `id` was still registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.remove(id)
    }

    /// Deliver `event` to every destination registered when the snapshot is
    /// taken. Waits on destinations whose queue is full, unless they are
    /// unsubscribed meanwhile; a destination whose receiver is gone is torn
    /// down without affecting the others.
    ///
    /// Returns the number of destinations that accepted the event.
    pub async fn publish(&self, event: &CallEvent) -> usize {
        let targets: Vec<(SubscriptionId, LogSink)> = {
            let reg = self.inner.registry.lock();
            reg.sinks.iter().map(|(id, s)| (*id, s.clone())).collect()
        };

        let mut delivered = 0;
        for (id, sink) in targets {
            let sent = tokio::select! {
                biased;
                _ = sink.cancel.cancelled() => continue,
                r = sink.tx.send(event.clone()) => r,
            };
            match sent {
                Ok(()) => delivered += 1,
                Err(_) => {
                    let err = HubError::TransportFailure("log subscriber receiver dropped".into());
                    tracing::warn!(sub_id = id, error = %err, "log delivery failed; tearing down subscription");
                    self.inner.metrics.delivery_failures.inc(&[("kind", "log")]);
                    self.inner.remove(id);
                }
            }
        }

        if delivered > 0 {
            self.inner.metrics.events_delivered.add(&[], delivered as u64);
        }
        delivered
    }

    pub fn count(&self) -> usize {
        self.inner.registry.lock().sinks.len()
    }

    /// Drop every destination and refuse new ones.
    pub fn close(&self) {
        let drained: Vec<(SubscriptionId, LogSink)> = {
            let mut reg = self.inner.registry.lock();
            reg.closed = true;
            reg.sinks.drain().collect()
        };
        for (_, sink) in &drained {
            sink.cancel.cancel();
        }
        self.inner
            .metrics
            .subscribers_active
            .add(&[("kind", "log")], -(drained.len() as i64));
    }
}

/// Receiving side of a log subscription.
pub struct LogSubscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<CallEvent>,
    cancel: CancellationToken,
    owner: Weak<Inner>,
}

impl LogSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next event, or `None` once unsubscribed or the hub closed.
    /// Events still queued at unsubscribe time are discarded.
    pub async fn recv(&mut self) -> Option<CallEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            ev = self.rx.recv() => ev.filter(|_| !self.cancel.is_cancelled()),
        }
    }

    pub fn try_recv(&mut self) -> Option<CallEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.rx.try_recv().ok()
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(inner) = self.owner.upgrade() {
            inner.remove(self.id);
        }
    }
}

#[async_trait]
impl PushSource for LogSubscription {
    type Item = CallEvent;

    fn id(&self) -> SubscriptionId {
        self.id
    }

    async fn next_item(&mut self) -> Option<CallEvent> {
        self.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broadcaster() -> EventBroadcaster {
        EventBroadcaster::new(16, Arc::new(HubMetrics::default()))
    }

    fn ev(method: &str) -> CallEvent {
        CallEvent::new("biz_user", method, "127.0.0.1:5000")
    }

    #[tokio::test]
    async fn every_subscriber_gets_its_own_copy_in_order() {
        let b = broadcaster();
        let mut s1 = b.subscribe().unwrap();
        let mut s2 = b.subscribe().unwrap();
        assert_ne!(s1.id(), s2.id());

        assert_eq!(b.publish(&ev("Biz/Check")).await, 2);
        assert_eq!(b.publish(&ev("Biz/Add")).await, 2);

        for sub in [&mut s1, &mut s2] {
            assert_eq!(sub.recv().await.unwrap().method, "Biz/Check");
            assert_eq!(sub.recv().await.unwrap().method, "Biz/Add");
            assert!(sub.try_recv().is_none());
        }
    }

    #[tokio::test]
    async fn late_subscriber_sees_no_replay() {
        let b = broadcaster();
        b.publish(&ev("Biz/Check")).await;
        let mut late = b.subscribe().unwrap();
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn drop_unregisters_exactly_once() {
        let b = broadcaster();
        let sub = b.subscribe().unwrap();
        let id = sub.id();
        assert_eq!(b.count(), 1);

        drop(sub);
        assert_eq!(b.count(), 0);
        assert!(!b.unsubscribe(id));
        assert_eq!(b.publish(&ev("Biz/Check")).await, 0);
    }

    #[tokio::test]
    async fn unsubscribed_handle_receives_nothing_more() {
        let b = broadcaster();
        let mut sub = b.subscribe().unwrap();
        b.publish(&ev("Biz/Check")).await;

        assert!(b.unsubscribe(sub.id()));
        b.publish(&ev("Biz/Add")).await;

        // queued-but-unread events are discarded too
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn unsubscribe_releases_a_publish_blocked_on_that_sink() {
        let b = EventBroadcaster::new(1, Arc::new(HubMetrics::default()));
        let mut slow = b.subscribe().unwrap();
        assert_eq!(b.publish(&ev("Biz/Check")).await, 1); // queue now full

        let b2 = b.clone();
        let pending = tokio::spawn(async move { b2.publish(&ev("Biz/Add")).await });
        tokio::task::yield_now().await;

        assert!(b.unsubscribe(slow.id()));
        assert_eq!(pending.await.unwrap(), 0);
        assert!(slow.recv().await.is_none());
    }

    #[tokio::test]
    async fn close_ends_streams_and_refuses_new_subscribers() {
        let b = broadcaster();
        let mut sub = b.subscribe().unwrap();
        b.close();

        assert!(sub.recv().await.is_none());
        let err = b.subscribe().err().expect("closed hub must refuse");
        assert_eq!(err.client_code().as_str(), "TRANSPORT_FAILURE");
    }
}
