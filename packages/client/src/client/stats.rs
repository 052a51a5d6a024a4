//! Service-wide statistics

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters shared by the service and every backend it builds.
#[derive(Debug)]
pub struct StatisticsCounters {
    /// Clients built through the backend provider
    pub created_clients: AtomicU64,
    /// Cache hits in `get_client`
    pub reused_clients: AtomicU64,
    /// Requests handed to a backend
    pub requests: AtomicU64,
    /// Sum of request sizes
    pub request_bytes: AtomicU64,
    /// Sum of response sizes
    pub response_bytes: AtomicU64,
    /// Service start time
    pub started_at: Instant,
}

impl Default for StatisticsCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsCounters {
    #[must_use]
    pub fn new() -> Self {
        Self {
            created_clients: AtomicU64::new(0),
            reused_clients: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            request_bytes: AtomicU64::new(0),
            response_bytes: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn record_created(&self) {
        self.created_clients.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reused(&self) {
        self.reused_clients.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request about to be sent and its size
    pub fn record_request(&self, bytes: u64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.request_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a received response's size
    pub fn record_response(&self, bytes: u64) {
        self.response_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Create a snapshot of current statistics
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            created_clients: self.created_clients.load(Ordering::Relaxed),
            reused_clients: self.reused_clients.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            request_bytes: self.request_bytes.load(Ordering::Relaxed),
            response_bytes: self.response_bytes.load(Ordering::Relaxed),
            uptime: self.uptime(),
        }
    }
}

/// Statistics at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    pub created_clients: u64,
    pub reused_clients: u64,
    pub requests: u64,
    pub request_bytes: u64,
    pub response_bytes: u64,
    #[serde(rename = "uptime_ms", serialize_with = "as_millis")]
    pub uptime: Duration,
}

impl StatisticsSnapshot {
    /// Flat string map for health/debug output.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("createdClients".to_string(), self.created_clients.to_string()),
            ("reusedClients".to_string(), self.reused_clients.to_string()),
            ("requests".to_string(), self.requests.to_string()),
            ("requestBytes".to_string(), self.request_bytes.to_string()),
            ("responseBytes".to_string(), self.response_bytes.to_string()),
            ("uptimeMs".to_string(), self.uptime.as_millis().to_string()),
        ])
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
