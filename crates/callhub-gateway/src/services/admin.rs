//! Admin subscription streams.
//!
//! Both are long-lived server-push calls: `Logging` streams one
//! [`CallEvent`](callhub_core::CallEvent) per authorized call, `Statistics`
//! streams one [`StatSnapshot`](callhub_core::StatSnapshot) per elapsed
//! interval.

use std::time::Duration;

use callhub_core::error::{HubError, Result};

use crate::hub::{Hub, LogSubscription, StatSubscription};

pub const SERVICE: &str = "Admin";
pub const LOGGING: &str = "Admin/Logging";
pub const STATISTICS: &str = "Admin/Statistics";

pub fn open_logging(hub: &Hub) -> Result<LogSubscription> {
    hub.broadcaster().subscribe()
}

/// `interval_seconds` arrives as raw text from the transport.
pub fn open_statistics(hub: &Hub, interval_seconds: Option<&str>) -> Result<StatSubscription> {
    let raw = interval_seconds
        .ok_or_else(|| HubError::BadRequest("interval_seconds is required".into()))?;
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| HubError::BadRequest(format!("invalid interval_seconds: {raw}")))?;
    hub.stats().subscribe(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::HubSection;
    use crate::obs::HubMetrics;

    #[tokio::test]
    async fn statistics_interval_is_validated() {
        let hub = Hub::new(&HubSection::default(), Arc::new(HubMetrics::default()));

        for bad in [None, Some("abc"), Some("0"), Some("-1"), Some("999999")] {
            let err = open_statistics(&hub, bad).err().expect("must reject");
            assert_eq!(err.client_code().as_str(), "BAD_REQUEST", "input={bad:?}");
        }

        let sub = open_statistics(&hub, Some("2")).unwrap();
        assert_eq!(hub.stats().interval_of(sub.id()), Some(Duration::from_secs(2)));
        let _log = open_logging(&hub).unwrap();
        assert_eq!(hub.broadcaster().count(), 1);
    }
}
