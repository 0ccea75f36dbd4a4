//! Camera access and preview frames.
//!
//! This module provides the capability traits the rest of the crate drives
//! ([`CameraDevice`], [`CameraPool`]), the [`CameraHandle`] that owns a camera
//! across start/stop transitions, and the configuration file format.

mod camera;
mod config;
mod frame;
mod handle;
mod mock;
mod params;

pub use camera::{
    AutoFocusCallback, CameraDevice, CameraError, CameraPool, FrameCallback, PreviewSurface,
};
pub use config::{CameraConfig, ConfigError, FileConfig, OutputConfig, ScannerConfig, StreamConfig};
pub use frame::{PixelFormat, PreviewFrame};
pub use handle::{CameraHandle, CameraSession, StartOutcome, SwitchOutcome};
pub use mock::{MockCalls, MockCamera, MockCameraPool};
pub use params::{
    best_size, AreaRect, CameraParameters, CameraType, CaptureMode, FlashMode, FocusMode,
    MeteringArea, Size,
};
