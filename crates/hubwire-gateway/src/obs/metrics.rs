//! Minimal labelled metric families backed by `DashMap`.
//!
//! Label sets are flattened into sorted key vectors so rendering order is
//! deterministic. Histogram buckets are fixed, in microseconds.

use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn render_labels(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{k}=\"{}\"", escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        self.map
            .entry(label_key(labels))
            .or_default()
            .fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} counter");
        for r in self.map.iter() {
            let v = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}{{{}}} {v}", render_labels(r.key()));
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn dec(&self, labels: &[(&str, &str)]) {
        self.add(labels, -1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        self.map
            .entry(label_key(labels))
            .or_default()
            .fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map_or(0, |g| g.load(Ordering::Relaxed))
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} gauge");
        for r in self.map.iter() {
            let v = r.value().load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}{{{}}} {v}", render_labels(r.key()));
        }
    }
}

// 100us .. 1s
const BUCKETS_MICROS: [u64; 9] = [
    100, 500, 1_000, 5_000, 10_000, 50_000, 100_000, 500_000, 1_000_000,
];

#[derive(Default)]
struct Histogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; 9],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, Histogram>,
}

impl HistogramVec {
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        let hist = self.map.entry(label_key(labels)).or_default();
        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);
        for (bucket, &le) in hist.buckets.iter().zip(BUCKETS_MICROS.iter()) {
            if micros <= le {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map_or(0, |h| h.count.load(Ordering::Relaxed))
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} histogram");
        for r in self.map.iter() {
            let labels = render_labels(r.key());
            let prefix = if labels.is_empty() {
                String::new()
            } else {
                format!("{labels},")
            };
            let hist = r.value();
            for (bucket, le) in hist.buckets.iter().zip(BUCKETS_MICROS) {
                let _ = writeln!(
                    out,
                    "{name}_bucket{{{prefix}le=\"{le}\"}} {}",
                    bucket.load(Ordering::Relaxed)
                );
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"+Inf\"}} {count}");
            let _ = writeln!(out, "{name}_sum{{{labels}}} {}", hist.sum.load(Ordering::Relaxed));
            let _ = writeln!(out, "{name}_count{{{labels}}} {count}");
        }
    }
}

/// Every metric family the gateway exports.
#[derive(Default)]
pub struct HubMetrics {
    pub connections_opened: CounterVec,
    pub connections_active: GaugeVec,
    pub decode_errors: CounterVec,
    pub rpc_calls: CounterVec,
    /// Microseconds.
    pub rpc_duration: HistogramVec,
    pub subscriptions: CounterVec,
    pub publishes: CounterVec,
    pub deliveries: CounterVec,
    pub selection_faults: CounterVec,
}

impl HubMetrics {
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.connections_opened.render("hubwire_connections_opened_total", &mut out);
        self.connections_active.render("hubwire_connections_active", &mut out);
        self.decode_errors.render("hubwire_decode_errors_total", &mut out);
        self.rpc_calls.render("hubwire_rpc_calls_total", &mut out);
        self.rpc_duration.render("hubwire_rpc_duration_micros", &mut out);
        self.subscriptions.render("hubwire_subscription_requests_total", &mut out);
        self.publishes.render("hubwire_publishes_total", &mut out);
        self.deliveries.render("hubwire_deliveries_total", &mut out);
        self.selection_faults.render("hubwire_selection_faults_total", &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_keyed_by_sorted_labels() {
        let c = CounterVec::default();
        c.inc(&[("b", "2"), ("a", "1")]);
        c.add(&[("a", "1"), ("b", "2")], 4);
        assert_eq!(c.get(&[("a", "1"), ("b", "2")]), 5);

        let mut out = String::new();
        c.render("x_total", &mut out);
        assert!(out.contains("x_total{a=\"1\",b=\"2\"} 5"));
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let h = HistogramVec::default();
        h.observe(&[("namespace", "chat")], Duration::from_micros(700));
        assert_eq!(h.count(&[("namespace", "chat")]), 1);

        let mut out = String::new();
        h.render("d", &mut out);
        assert!(out.contains("d_bucket{namespace=\"chat\",le=\"500\"} 0"));
        assert!(out.contains("d_bucket{namespace=\"chat\",le=\"1000\"} 1"));
        assert!(out.contains("d_bucket{namespace=\"chat\",le=\"+Inf\"} 1"));
        assert!(out.contains("d_sum{namespace=\"chat\"} 700"));
    }

    #[test]
    fn gauge_and_escaping() {
        let g = GaugeVec::default();
        g.inc(&[]);
        g.inc(&[]);
        g.dec(&[]);
        assert_eq!(g.get(&[]), 1);

        let m = HubMetrics::default();
        m.rpc_calls.inc(&[("method", "say \"hi\"")]);
        assert!(m.render().contains(r#"method="say \"hi\"""#));
    }
}
