//! Camera capability abstraction.
//!
//! This module provides trait-based seams over the camera driver so the
//! pipeline can run against real hardware bindings or the mock devices in
//! [`super::mock`].

use super::{CameraParameters, CameraType, PreviewFrame};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CameraError {
    /// No camera could be acquired for the requested type.
    #[error("camera hardware unavailable: {0}")]
    HardwareUnavailable(String),
    /// The camera refused the negotiated parameters.
    #[error("camera rejected configuration: {0}")]
    ConfigurationRejected(String),
    /// The operation targeted a camera that is not (or no longer) open.
    #[error("camera not open")]
    NotOpen,
    /// A driver command failed.
    #[error("camera device error: {0}")]
    Device(String),
}

impl CameraError {
    /// Whether the error should be treated as fatal by the caller.
    ///
    /// Missing hardware, rejected parameters and writes against a released
    /// camera are recoverable: the handle is left in a state where `start`
    /// can be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Device(_))
    }
}

/// Callback invoked on the producer thread for every preview frame.
pub type FrameCallback = Arc<dyn Fn(PreviewFrame) + Send + Sync>;

/// One-shot completion for [`CameraDevice::auto_focus`]; receives success.
pub type AutoFocusCallback = Box<dyn FnOnce(bool) + Send>;

/// Opaque handle to the output surface the preview renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSurface {
    id: u64,
    width: u32,
    height: u32,
}

impl PreviewSurface {
    pub fn new(id: u64, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns a copy with updated dimensions.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self { width, height, ..*self }
    }
}

/// An opened camera.
///
/// All methods take `&self`: the driver orders commands itself, and
/// implementations must return [`CameraError::NotOpen`] once the camera has
/// been released instead of panicking.
pub trait CameraDevice: Send + Sync {
    /// Reads the current parameter block.
    fn parameters(&self) -> Result<CameraParameters, CameraError>;

    /// Applies a parameter block.
    fn set_parameters(&self, params: &CameraParameters) -> Result<(), CameraError>;

    /// Binds (or unbinds, with `None`) the preview output surface.
    fn set_preview_surface(&self, surface: Option<&PreviewSurface>) -> Result<(), CameraError>;

    /// Registers (or clears, with `None`) the frame callback.
    fn set_frame_callback(&self, callback: Option<FrameCallback>) -> Result<(), CameraError>;

    fn start_preview(&self) -> Result<(), CameraError>;

    fn stop_preview(&self) -> Result<(), CameraError>;

    /// Starts a one-shot autofocus sweep.
    fn auto_focus(&self, done: AutoFocusCallback) -> Result<(), CameraError>;

    fn cancel_auto_focus(&self) -> Result<(), CameraError>;
}

/// Shared pool of camera resources keyed by camera type.
pub trait CameraPool: Send + Sync {
    /// Opens (or borrows) the camera for `camera_type`.
    fn acquire(&self, camera_type: CameraType) -> Result<Arc<dyn CameraDevice>, CameraError>;

    /// Returns the camera for `camera_type` to the pool.
    fn release(&self, camera_type: CameraType);
}
