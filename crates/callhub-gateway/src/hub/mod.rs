//! Telemetry hub: log fan-out and per-subscriber call statistics.
//!
//! The two registries are independent; each is guarded by its own lock and
//! each subscription is removed from its registry exactly once, either when
//! its handle drops or when the hub shuts down.

mod broadcaster;
mod stats;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::HubSection;
use crate::obs::HubMetrics;

pub use broadcaster::{EventBroadcaster, LogSubscription};
pub use stats::{StatSubscription, StatsAggregator};

/// Handle identifying one subscription inside its registry.
pub type SubscriptionId = u64;

/// A subscription whose items are pushed to a remote peer.
#[async_trait]
pub trait PushSource: Send {
    type Item: Serialize + Send;

    fn id(&self) -> SubscriptionId;

    /// Next item to push; `None` ends the stream.
    async fn next_item(&mut self) -> Option<Self::Item>;
}

pub struct Hub {
    broadcaster: EventBroadcaster,
    stats: StatsAggregator,
    metrics: Arc<HubMetrics>,
    shutdown: CancellationToken,
}

impl Hub {
    pub fn new(settings: &HubSection, metrics: Arc<HubMetrics>) -> Self {
        Self {
            broadcaster: EventBroadcaster::new(settings.log_buffer, Arc::clone(&metrics)),
            stats: StatsAggregator::new(
                settings.stats_buffer,
                Duration::from_secs(settings.max_stat_interval_secs),
                Arc::clone(&metrics),
            ),
            metrics,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    pub fn metrics(&self) -> &HubMetrics {
        &self.metrics
    }

    /// Cancelled once [`Hub::shutdown`] runs; open streams watch it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop every subscriber task and release both registries. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        tracing::info!(
            log_subscribers = self.broadcaster.count(),
            stats_subscribers = self.stats.count(),
            "hub shutting down"
        );
        self.metrics.set_draining();
        self.shutdown.cancel();
        self.broadcaster.close();
        self.stats.close();
    }
}
