//! Frame pipeline and the view-finder that drives it.
//!
//! # Data flow
//!
//! ```text
//! camera frame callback ──► FramePipeline::on_frame
//!                              │  try gate (drop frame if a decode is in flight)
//!                              ▼
//!                        DecodeExecutor job ──► orient_frame ──► BarcodeDecoder
//!                                                                   │
//!                                              EventSink ◄── CameraBarCodeRead
//! ```
//!
//! The preview surface feeds the optional stream session independently.

mod events;
mod executor;
mod orchestrator;
mod viewfinder;

pub use events::{BarcodeReadEvent, ChannelSink, EventPoint, EventSink, JsonLinesSink, BARCODE_READ_EVENT};
pub use executor::{DecodeExecutor, DecodeJob, InlineExecutor, SubmitError, WorkerPool};
pub use orchestrator::{FrameDisposition, FramePipeline, PipelineCounters, PipelineState};
pub use viewfinder::ViewFinder;
