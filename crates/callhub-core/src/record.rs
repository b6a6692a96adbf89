//! Records pushed to subscribers.
//!
//! Both records are plain owned values: every subscriber receives its own
//! clone, nothing is shared mutably between deliveries.

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// Seconds since the unix epoch (0 if the clock is before it).
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// One authorized call, as seen by log subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEvent {
    pub timestamp: i64,
    pub consumer: String,
    pub method: String,
    pub host: String,
}

impl CallEvent {
    pub fn new(consumer: impl Into<String>, method: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            timestamp: unix_now(),
            consumer: consumer.into(),
            method: method.into(),
            host: host.into(),
        }
    }
}

/// Per-subscriber counters accumulated between two flushes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatCounters {
    pub by_method: HashMap<String, u64>,
    pub by_consumer: HashMap<String, u64>,
}

impl StatCounters {
    pub fn record(&mut self, consumer: &str, method: &str) {
        *self.by_method.entry(method.to_string()).or_insert(0) += 1;
        *self.by_consumer.entry(consumer.to_string()).or_insert(0) += 1;
    }

    /// Number of calls counted (each call bumps exactly one method bucket).
    pub fn total(&self) -> u64 {
        self.by_method.values().sum()
    }
}

/// Flushed counters, stamped with the flush time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub timestamp: i64,
    pub by_method: BTreeMap<String, u64>,
    pub by_consumer: BTreeMap<String, u64>,
}

impl StatSnapshot {
    pub fn total(&self) -> u64 {
        self.by_method.values().sum()
    }
}

impl From<StatCounters> for StatSnapshot {
    fn from(c: StatCounters) -> Self {
        Self {
            timestamp: unix_now(),
            by_method: c.by_method.into_iter().collect(),
            by_consumer: c.by_consumer.into_iter().collect(),
        }
    }
}

/// JSON body returned for a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub msg: String,
}

impl From<&HubError> for ErrorBody {
    fn from(e: &HubError) -> Self {
        Self {
            code: e.client_code().as_str().to_string(),
            msg: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_partition_by_method_and_consumer() {
        let mut c = StatCounters::default();
        c.record("biz_user", "Biz/Check");
        c.record("biz_user", "Biz/Add");
        c.record("biz_admin", "Biz/Check");

        assert_eq!(c.total(), 3);
        assert_eq!(c.by_method.get("Biz/Check"), Some(&2));
        assert_eq!(c.by_consumer.get("biz_user"), Some(&2));

        let snap = StatSnapshot::from(c);
        assert_eq!(snap.total(), 3);
        assert_eq!(snap.by_consumer.values().sum::<u64>(), 3);
    }

    #[test]
    fn error_body_carries_client_code() {
        let body = ErrorBody::from(&HubError::Forbidden("Biz/Test".into()));
        assert_eq!(body.code, "FORBIDDEN");
        assert!(body.msg.contains("Biz/Test"));
    }
}
