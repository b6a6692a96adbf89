//! Minimal metrics registry for the hub.
//!
//! Counter/gauge types with dynamic labels backed by `DashMap`. Labels are
//! flattened into sorted key vectors to keep deterministic ordering.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn render_labels(key: &[(String, String)]) -> String {
    let inner = key
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",");
    if inner.is_empty() {
        inner
    } else {
        format!("{{{inner}}}")
    }
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self.map.entry(label_key(labels)).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for an exact label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{} {}", name, render_labels(r.key()), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<Vec<(String, String)>, AtomicI64>,
}

impl GaugeVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn dec(&self, labels: &[(&str, &str)]) {
        self.add(labels, -1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self.map.entry(label_key(labels)).or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for r in self.map.iter() {
            let val = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{}{} {}", name, render_labels(r.key()), val);
        }
    }
}

#[derive(Default)]
pub struct HubMetrics {
    /// outcome = accepted | unauthenticated | forbidden
    pub calls: CounterVec,
    pub events_delivered: CounterVec,
    /// kind = log | stats
    pub delivery_failures: CounterVec,
    pub stat_flushes: CounterVec,
    /// kind = log | stats
    pub subscribers_active: GaugeVec,
    draining: AtomicBool,
}

impl HubMetrics {
    pub fn set_draining(&self) {
        self.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Relaxed)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.calls.render("callhub_calls_total", &mut out);
        self.events_delivered.render("callhub_events_delivered_total", &mut out);
        self.delivery_failures.render("callhub_delivery_failures_total", &mut out);
        self.stat_flushes.render("callhub_stat_flushes_total", &mut out);
        self.subscribers_active.render("callhub_subscribers_active", &mut out);
        let _ = writeln!(
            out,
            "# TYPE callhub_draining gauge\ncallhub_draining {}",
            if self.is_draining() { 1 } else { 0 }
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_order_does_not_split_series() {
        let c = CounterVec::default();
        c.inc(&[("a", "1"), ("b", "2")]);
        c.inc(&[("b", "2"), ("a", "1")]);
        assert_eq!(c.get(&[("a", "1"), ("b", "2")]), 2);
    }

    #[test]
    fn render_escapes_and_formats() {
        let m = HubMetrics::default();
        m.calls.inc(&[("outcome", "accepted")]);
        m.stat_flushes.inc(&[]);
        m.subscribers_active.inc(&[("kind", "log")]);
        m.subscribers_active.dec(&[("kind", "log")]);

        let text = m.render();
        assert!(text.contains("callhub_calls_total{outcome=\"accepted\"} 1"));
        assert!(text.contains("callhub_stat_flushes_total 1"));
        assert!(text.contains("callhub_subscribers_active{kind=\"log\"} 0"));
        assert!(text.contains("callhub_draining 0"));
    }

    #[test]
    fn gauge_moves_both_ways_and_draining_latches() {
        let m = HubMetrics::default();
        let log = [("kind", "log")];
        m.subscribers_active.inc(&log);
        m.subscribers_active.inc(&log);
        m.subscribers_active.dec(&log);
        assert_eq!(m.subscribers_active.get(&log), 1);
        assert_eq!(m.subscribers_active.get(&[("kind", "stats")]), 0);

        assert!(!m.is_draining());
        m.set_draining();
        m.set_draining();
        assert!(m.is_draining());
        assert!(m.render().contains("callhub_draining 1"));
    }
}
