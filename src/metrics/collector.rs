//! Metrics collection and registry.

use crate::pipeline::ViewFinder;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of view-finder state for metrics update.
///
/// Counters are cumulative since the view-finder was created.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Decode jobs that ran to an outcome.
    pub decode_tasks: u64,
    /// Decodes that found a symbol.
    pub matches: u64,
    /// Decodes that found nothing.
    pub no_matches: u64,
    /// Decodes that ended in an error.
    pub decode_errors: u64,
    /// Matches discarded because no event sink was attached.
    pub events_discarded: u64,
    /// Successful camera starts.
    pub camera_starts: u64,
    /// Completed camera stops.
    pub camera_stops: u64,
    /// Whether the stream session is uploading.
    pub streaming_active: bool,
}

/// Prometheus metrics registry for the view-finder.
pub struct MetricsRegistry {
    registry: Registry,

    // Decode metrics
    decode_tasks_total: IntCounter,
    matches_total: IntCounter,
    no_matches_total: IntCounter,
    decode_errors_total: IntCounter,
    events_discarded_total: IntCounter,

    // Camera metrics
    camera_starts_total: IntCounter,
    camera_stops_total: IntCounter,

    // Streaming metrics
    streaming_active: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all view-finder metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let decode_tasks_total = IntCounter::new(
            "viewfinder_decode_tasks_total",
            "Decode tasks that ran to an outcome",
        )?;
        let matches_total = IntCounter::new(
            "viewfinder_matches_total",
            "Decode tasks that found a barcode",
        )?;
        let no_matches_total = IntCounter::new(
            "viewfinder_no_matches_total",
            "Decode tasks that found no barcode",
        )?;
        let decode_errors_total = IntCounter::new(
            "viewfinder_decode_errors_total",
            "Decode tasks that ended in an error",
        )?;
        let events_discarded_total = IntCounter::new(
            "viewfinder_events_discarded_total",
            "Barcode results discarded because the event sink was gone",
        )?;

        let camera_starts_total = IntCounter::new(
            "viewfinder_camera_starts_total",
            "Successful camera starts",
        )?;
        let camera_stops_total = IntCounter::new(
            "viewfinder_camera_stops_total",
            "Completed camera stops",
        )?;

        let streaming_active = IntGauge::new(
            "viewfinder_streaming_active",
            "Whether the preview is being streamed (1=active, 0=inactive)",
        )?;

        registry.register(Box::new(decode_tasks_total.clone()))?;
        registry.register(Box::new(matches_total.clone()))?;
        registry.register(Box::new(no_matches_total.clone()))?;
        registry.register(Box::new(decode_errors_total.clone()))?;
        registry.register(Box::new(events_discarded_total.clone()))?;
        registry.register(Box::new(camera_starts_total.clone()))?;
        registry.register(Box::new(camera_stops_total.clone()))?;
        registry.register(Box::new(streaming_active.clone()))?;

        Ok(Self {
            registry,
            decode_tasks_total,
            matches_total,
            no_matches_total,
            decode_errors_total,
            events_discarded_total,
            camera_starts_total,
            camera_stops_total,
            streaming_active,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        // Counters only move forward by the difference
        let advance = |counter: &IntCounter, total: u64| {
            let current = counter.get();
            if total > current {
                counter.inc_by(total - current);
            }
        };

        advance(&self.decode_tasks_total, snapshot.decode_tasks);
        advance(&self.matches_total, snapshot.matches);
        advance(&self.no_matches_total, snapshot.no_matches);
        advance(&self.decode_errors_total, snapshot.decode_errors);
        advance(&self.events_discarded_total, snapshot.events_discarded);
        advance(&self.camera_starts_total, snapshot.camera_starts);
        advance(&self.camera_stops_total, snapshot.camera_stops);

        self.streaming_active.set(i64::from(snapshot.streaming_active));
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of a view-finder.
    pub fn from_view_finder(viewfinder: &ViewFinder) -> Self {
        let stats = viewfinder.pipeline().stats();
        Self {
            decode_tasks: stats.decode_tasks,
            matches: stats.matched,
            no_matches: stats.no_match,
            decode_errors: stats.errors,
            events_discarded: stats.events_discarded,
            camera_starts: viewfinder.camera().starts(),
            camera_stops: viewfinder.camera().stops(),
            streaming_active: viewfinder.stream().is_some_and(|s| s.is_active()),
        }
    }
}
