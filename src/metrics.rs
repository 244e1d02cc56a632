//! Lightweight global metrics for StudentQR.
//!
//! Потокобезопасные атомарные счётчики:
//! - HTTP requests / bad requests
//! - Registrations
//! - Profile lookups (found / missing)
//! - QR renders

use std::sync::atomic::{AtomicU64, Ordering};

static HTTP_REQUESTS_TOTAL: AtomicU64 = AtomicU64::new(0);
static BAD_REQUESTS_TOTAL: AtomicU64 = AtomicU64::new(0);
static REGISTRATIONS_TOTAL: AtomicU64 = AtomicU64::new(0);
static LOOKUPS_FOUND: AtomicU64 = AtomicU64::new(0);
static LOOKUPS_MISSING: AtomicU64 = AtomicU64::new(0);
static QR_RENDERS_TOTAL: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub http_requests_total: u64,
    pub bad_requests_total: u64,
    pub registrations_total: u64,
    pub lookups_found: u64,
    pub lookups_missing: u64,
    pub qr_renders_total: u64,
}

impl MetricsSnapshot {
    pub fn lookup_hit_ratio(&self) -> f64 {
        let total = self.lookups_found + self.lookups_missing;
        if total == 0 {
            0.0
        } else {
            self.lookups_found as f64 / total as f64
        }
    }

    /// Prometheus text exposition (0.0.4).
    pub fn to_prometheus(&self, store_records: Option<u64>) -> String {
        let mut out = String::new();

        let ver = env!("CARGO_PKG_VERSION");
        out.push_str("# HELP studentqr_build_info Build info.\n");
        out.push_str("# TYPE studentqr_build_info gauge\n");
        out.push_str(&format!("studentqr_build_info{{version=\"{}\"}} 1\n", ver));

        let counters: [(&str, &str, u64); 6] = [
            ("http_requests_total", "HTTP requests handled.", self.http_requests_total),
            ("bad_requests_total", "Requests rejected with 400.", self.bad_requests_total),
            ("registrations_total", "Students registered.", self.registrations_total),
            ("lookups_found_total", "Profile lookups that found a record.", self.lookups_found),
            ("lookups_missing_total", "Profile lookups that found nothing.", self.lookups_missing),
            ("qr_renders_total", "QR images written.", self.qr_renders_total),
        ];
        for (name, help, v) in counters {
            out.push_str(&format!("# HELP studentqr_{} {}\n", name, help));
            out.push_str(&format!("# TYPE studentqr_{} counter\n", name));
            out.push_str(&format!("studentqr_{} {}\n", name, v));
        }

        out.push_str("# HELP studentqr_lookup_hit_ratio Profile lookup hit ratio (percent).\n");
        out.push_str("# TYPE studentqr_lookup_hit_ratio gauge\n");
        out.push_str(&format!(
            "studentqr_lookup_hit_ratio {:.2}\n",
            self.lookup_hit_ratio() * 100.0
        ));

        if let Some(n) = store_records {
            out.push_str("# HELP studentqr_store_records Rows in the record store.\n");
            out.push_str("# TYPE studentqr_store_records gauge\n");
            out.push_str(&format!("studentqr_store_records {}\n", n));
        }
        out
    }
}

pub fn record_http_request() {
    HTTP_REQUESTS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_bad_request() {
    BAD_REQUESTS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_registration() {
    REGISTRATIONS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_lookup(found: bool) {
    if found {
        LOOKUPS_FOUND.fetch_add(1, Ordering::Relaxed);
    } else {
        LOOKUPS_MISSING.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_qr_render() {
    QR_RENDERS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        http_requests_total: HTTP_REQUESTS_TOTAL.load(Ordering::Relaxed),
        bad_requests_total: BAD_REQUESTS_TOTAL.load(Ordering::Relaxed),
        registrations_total: REGISTRATIONS_TOTAL.load(Ordering::Relaxed),
        lookups_found: LOOKUPS_FOUND.load(Ordering::Relaxed),
        lookups_missing: LOOKUPS_MISSING.load(Ordering::Relaxed),
        qr_renders_total: QR_RENDERS_TOTAL.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prometheus_text_has_counters() {
        let m = MetricsSnapshot {
            registrations_total: 3,
            lookups_found: 1,
            lookups_missing: 1,
            ..Default::default()
        };
        let text = m.to_prometheus(Some(3));
        assert!(text.contains("studentqr_registrations_total 3\n"));
        assert!(text.contains("# TYPE studentqr_qr_renders_total counter\n"));
        assert!(text.contains("studentqr_lookup_hit_ratio 50.00\n"));
        assert!(text.contains("studentqr_store_records 3\n"));
    }

    #[test]
    fn store_gauge_optional() {
        let text = MetricsSnapshot::default().to_prometheus(None);
        assert!(!text.contains("studentqr_store_records"));
        assert!(text.contains("studentqr_lookup_hit_ratio 0.00\n"));
    }
}
