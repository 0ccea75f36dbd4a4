//! Camera View-Finder Library
//!
//! A camera preview surface with real-time barcode decoding and optional
//! live streaming of the preview to a video ingestion service.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → pipeline (gate → decode) → event sink
//!    ↓                         ↑
//! preview surface → streaming  gesture (zoom, focus)
//! ```
//!
//! # Design Principles
//!
//! - **Never block the producer**: the frame callback only tries a gate
//! - **Lossy backpressure**: at most one decode in flight, other frames dropped
//! - **Contained failures**: decode and streaming errors never reach the camera
//! - **Coalesced transitions**: overlapping start/stop calls are dropped, not queued
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use viewfinder::{
//!     capture::{CameraType, MockCameraPool, PreviewSurface},
//!     decode::BarcodeDecoder,
//!     pipeline::{ChannelSink, FramePipeline, ViewFinder, WorkerPool},
//! };
//!
//! let pool = Arc::new(MockCameraPool::with_both());
//! let workers = Arc::new(WorkerPool::new(2).unwrap());
//! let pipeline = FramePipeline::new(BarcodeDecoder::from_names(&["qr"]), workers);
//! let viewfinder = ViewFinder::new(pool.clone(), CameraType::Back, Arc::new(pipeline));
//!
//! let (tx, rx) = crossbeam_channel::unbounded();
//! viewfinder.attach_sink(Arc::new(ChannelSink::new(tx)));
//! viewfinder.on_surface_available(PreviewSurface::new(1, 640, 480)).unwrap();
//!
//! // Frames pushed by the camera are decoded off the producer thread
//! let camera = pool.device(CameraType::Back).unwrap();
//! camera.emit_frame(viewfinder::capture::MockCamera::noise_frame(640, 480, 1));
//!
//! for (name, event) in rx.try_iter() {
//!     println!("{name}: {} ({})", event.data, event.kind);
//! }
//! viewfinder.on_surface_destroyed().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod decode;
pub mod gesture;
pub mod metrics;
pub mod pipeline;
pub mod streaming;

// Re-export commonly used types at crate root
pub use capture::{CameraError, CameraHandle, CameraType, FileConfig, MockCamera, MockCameraPool, PreviewFrame};
pub use decode::{BarcodeDecoder, DecodeResult, FrameDecodeGate, SymbologySet};
pub use gesture::{GestureController, GestureError};
pub use pipeline::{BarcodeReadEvent, EventSink, FramePipeline, ViewFinder, WorkerPool};
pub use streaming::{StreamError, StreamSession};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
