//! Touch-driven zoom and focus.
//!
//! The math lives in `touch` (pinch spacing and zoom steps) and `focus`
//! (touch point to driver focus area); [`GestureController`] applies the
//! results to an open camera.

mod controller;
mod focus;
mod touch;

pub use controller::{GestureController, GestureOutcome};
pub use focus::{focus_area, AREA_COORDINATE_MAX, FOCUS_AREA_SIZE, FOCUS_AREA_WEIGHT};
pub use touch::{finger_spacing, next_zoom, PinchTracker, TouchAction, TouchEvent, TouchPoint};

use crate::capture::CameraError;
use thiserror::Error;

/// Errors from gesture handling. Callers log these and carry on.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GestureError {
    /// The touch point lies outside the preview surface.
    #[error("touch ({x}, {y}) outside {width}x{height} surface")]
    OutOfBounds { x: f32, y: f32, width: u32, height: u32 },
    /// No camera is open.
    #[error("no camera open")]
    NoCamera,
    /// The camera rejected a command.
    #[error("camera command failed: {0}")]
    Camera(#[from] CameraError),
}
