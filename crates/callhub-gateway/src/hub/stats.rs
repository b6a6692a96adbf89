use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use callhub_core::error::{HubError, Result};
use callhub_core::{StatCounters, StatSnapshot};

use crate::hub::{PushSource, SubscriptionId};
use crate::obs::HubMetrics;

/// One statistics subscriber: its counters and the timer task flushing them.
struct StatSlot {
    counters: StatCounters,
    interval: Duration,
    task: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct StatsTable {
    slots: HashMap<SubscriptionId, StatSlot>,
    closed: bool,
}

struct Inner {
    table: Mutex<StatsTable>,
    seq: AtomicU64,
    buffer: usize,
    max_interval: Duration,
    metrics: Arc<HubMetrics>,
}

impl Inner {
    fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.table.lock().slots.remove(&id);
        match removed {
            Some(slot) => {
                retire(slot);
                self.metrics.subscribers_active.dec(&[("kind", "stats")]);
                tracing::info!(sub_id = id, "stats subscription closed");
                true
            }
            None => false,
        }
    }

    /// Capture-and-reset under the table lock.
    fn take(&self, id: SubscriptionId) -> Option<StatSnapshot> {
        let mut table = self.table.lock();
        let slot = table.slots.get_mut(&id)?;
        Some(StatSnapshot::from(std::mem::take(&mut slot.counters)))
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // a dropped JoinHandle detaches; abort explicitly
        for (_, slot) in self.table.get_mut().slots.drain() {
            retire(slot);
        }
    }
}

fn retire(slot: StatSlot) {
    slot.cancel.cancel();
    if let Some(task) = slot.task {
        task.abort();
    }
}

/// Per-subscriber call counters, each flushed on its own timer.
///
/// Subscribers live in an arena keyed by [`SubscriptionId`]; a slot owns its
/// counters and its timer task, so removing the slot removes both.
#[derive(Clone)]
pub struct StatsAggregator {
    inner: Arc<Inner>,
}

impl StatsAggregator {
    pub fn new(buffer: usize, max_interval: Duration, metrics: Arc<HubMetrics>) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: Mutex::new(StatsTable::default()),
                seq: AtomicU64::new(1),
                buffer: buffer.max(1),
                max_interval,
                metrics,
            }),
        }
    }

    /// Register a subscriber flushing every `interval` and start its timer.
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self, interval: Duration) -> Result<StatSubscription> {
        if interval.is_zero() {
            return Err(HubError::BadRequest("stat interval must be positive".into()));
        }
        if interval > self.inner.max_interval {
            return Err(HubError::BadRequest(format!(
                "stat interval must not exceed {}s",
                self.inner.max_interval.as_secs()
            )));
        }

        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let cancel = CancellationToken::new();
        let id = self.inner.seq.fetch_add(1, Ordering::Relaxed);

        {
            let mut table = self.inner.table.lock();
            if table.closed {
                return Err(HubError::TransportFailure("hub is shutting down".into()));
            }
            table.slots.insert(
                id,
                StatSlot {
                    counters: StatCounters::default(),
                    interval,
                    task: None,
                    cancel: cancel.clone(),
                },
            );
        }

        let task = tokio::spawn(run_timer(Arc::downgrade(&self.inner), id, interval, tx));
        {
            let mut table = self.inner.table.lock();
            match table.slots.get_mut(&id) {
                Some(slot) => slot.task = Some(task),
                // removed (or hub closed) before the timer could be attached
                None => task.abort(),
            }
        }

        self.inner.metrics.subscribers_active.inc(&[("kind", "stats")]);
        tracing::info!(sub_id = id, interval_secs = interval.as_secs_f64(), "stats subscription opened");

        Ok(StatSubscription {
            id,
            rx,
            cancel,
            owner: Arc::downgrade(&self.inner),
        })
    }

    /// Count one call for every live subscriber.
    pub fn record(&self, consumer: &str, method: &str) {
        let mut table = self.inner.table.lock();
        for slot in table.slots.values_mut() {
            slot.counters.record(consumer, method);
        }
    }

    /// Stop the timer and drop the counters. Idempotent.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.remove(id)
    }

    /// Capture and reset one subscriber's counters outside its timer.
    pub fn flush_now(&self, id: SubscriptionId) -> Option<StatSnapshot> {
        self.inner.take(id)
    }

    pub fn interval_of(&self, id: SubscriptionId) -> Option<Duration> {
        self.inner.table.lock().slots.get(&id).map(|s| s.interval)
    }

    pub fn count(&self) -> usize {
        self.inner.table.lock().slots.len()
    }

    /// Abort every timer, drop every counter table, and refuse new subscribers.
    pub fn close(&self) {
        let drained: Vec<StatSlot> = {
            let mut table = self.inner.table.lock();
            table.closed = true;
            table.slots.drain().map(|(_, s)| s).collect()
        };
        let n = drained.len();
        for slot in drained {
            retire(slot);
        }
        self.inner
            .metrics
            .subscribers_active
            .add(&[("kind", "stats")], -(n as i64));
    }
}

async fn run_timer(
    owner: Weak<Inner>,
    id: SubscriptionId,
    period: Duration,
    tx: mpsc::Sender<StatSnapshot>,
) {
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tick.tick().await;

        let Some(inner) = owner.upgrade() else { break };
        // a missing slot means the subscriber is gone; nothing left to flush
        let Some(snapshot) = inner.take(id) else { break };
        inner.metrics.stat_flushes.inc(&[]);

        if tx.send(snapshot).await.is_err() {
            let err = HubError::TransportFailure("stats subscriber receiver dropped".into());
            tracing::warn!(sub_id = id, error = %err, "stats delivery failed; tearing down subscription");
            inner.metrics.delivery_failures.inc(&[("kind", "stats")]);
            inner.remove(id);
            break;
        }
    }
}

/// Receiving side of a statistics subscription.
pub struct StatSubscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<StatSnapshot>,
    cancel: CancellationToken,
    owner: Weak<Inner>,
}

impl StatSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next flushed snapshot, or `None` once unsubscribed or the hub closed.
    pub async fn recv(&mut self) -> Option<StatSnapshot> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            snap = self.rx.recv() => snap.filter(|_| !self.cancel.is_cancelled()),
        }
    }
}

impl Drop for StatSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(inner) = self.owner.upgrade() {
            inner.remove(self.id);
        }
    }
}

#[async_trait]
impl PushSource for StatSubscription {
    type Item = StatSnapshot;

    fn id(&self) -> SubscriptionId {
        self.id
    }

    async fn next_item(&mut self) -> Option<StatSnapshot> {
        self.recv().await
    }
}
