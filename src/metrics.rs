//! Flush metrics
//!
//! Lock-free counters for memtable flushes and the scoped guard that feeds them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters shared by every memtable file of an instance
#[derive(Debug, Default)]
pub struct Metrics {
    serialize_count: AtomicU64,
    serialize_bytes: AtomicU64,
    serialize_micros: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed serialize measurements
    pub fn serialize_count(&self) -> u64 {
        self.serialize_count.load(Ordering::Relaxed)
    }

    /// Total buffered bytes flushed
    pub fn serialize_bytes(&self) -> u64 {
        self.serialize_bytes.load(Ordering::Relaxed)
    }

    /// Total time spent in serialize, in microseconds
    pub fn serialize_micros(&self) -> u64 {
        self.serialize_micros.load(Ordering::Relaxed)
    }

    fn record_serialize(&self, size: u64, micros: u64) {
        self.serialize_count.fetch_add(1, Ordering::Relaxed);
        self.serialize_bytes.fetch_add(size, Ordering::Relaxed);
        self.serialize_micros.fetch_add(micros, Ordering::Relaxed);
    }
}

/// Measures one serialize call from construction to drop
pub struct CollectSerializeMetrics<'a> {
    metrics: &'a Metrics,
    size: u64,
    start: Instant,
}

impl<'a> CollectSerializeMetrics<'a> {
    pub fn new(metrics: &'a Metrics, size: usize) -> Self {
        Self {
            metrics,
            size: size as u64,
            start: Instant::now(),
        }
    }
}

impl Drop for CollectSerializeMetrics<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        self.metrics.record_serialize(self.size, elapsed.as_micros() as u64);

        tracing::trace!(
            size = self.size,
            elapsed_ms = format_args!("{:.3}", elapsed.as_secs_f64() * 1000.0),
            "serialize measured"
        );
    }
}
