//! Prometheus metrics exporter for the view-finder.
//!
//! This module provides observability into the frame pipeline and camera
//! lifecycle by exposing metrics in Prometheus format, optionally over HTTP
//! (the `metrics` feature). The HTTP endpoint pulls a snapshot per scrape.
//!
//! # Metrics Exposed
//!
//! ## Decode Metrics
//! - `viewfinder_decode_tasks_total` - Decode tasks that ran to an outcome
//! - `viewfinder_matches_total` - Decodes that found a barcode
//! - `viewfinder_no_matches_total` - Decodes that found nothing
//! - `viewfinder_decode_errors_total` - Decodes that ended in an error
//! - `viewfinder_events_discarded_total` - Results discarded after the sink was detached
//!
//! ## Camera Metrics
//! - `viewfinder_camera_starts_total` - Successful camera starts
//! - `viewfinder_camera_stops_total` - Completed camera stops
//!
//! ## Streaming Metrics
//! - `viewfinder_streaming_active` - 1 while the preview is being streamed
//!
//! Frames dropped at the decode gate are deliberately not counted.
//!
//! # Example
//!
//! ```no_run
//! use viewfinder::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     decode_tasks: 40,
//!     matches: 3,
//!     no_matches: 37,
//!     camera_starts: 1,
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, ServerError, SnapshotSource};
