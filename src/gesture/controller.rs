//! Applies touch gestures to the live camera.

use super::{focus_area, GestureError, PinchTracker, TouchAction, TouchEvent};
use crate::capture::{CameraDevice, CameraHandle, FocusMode};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// What a touch event did to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// The event is not a gesture this controller reacts to.
    Ignored,
    /// A second finger landed; its spacing was recorded.
    SpacingRecorded,
    /// Zoom was written with the new level.
    Zoomed(u32),
    /// Zoom is not supported by the camera.
    ZoomUnsupported,
    /// Focus and metering areas were written and autofocus triggered.
    Focused,
    /// The camera has no auto focus mode or no focus areas.
    FocusUnsupported,
}

/// Turns touch events into zoom and focus parameter writes.
///
/// Writes go straight to the camera device without the handle's transition
/// lock. A write racing a stop fails with
/// [`CameraError::NotOpen`](crate::capture::CameraError::NotOpen), which the
/// caller logs and ignores.
#[derive(Debug, Default)]
pub struct GestureController {
    pinch: Mutex<PinchTracker>,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles one touch event on a `width` x `height` preview surface.
    pub fn handle(
        &self,
        camera: &CameraHandle,
        event: &TouchEvent,
        width: u32,
        height: u32,
    ) -> Result<GestureOutcome, GestureError> {
        let device = camera.device().ok_or(GestureError::NoCamera)?;

        if event.is_multi_touch() {
            match event.action {
                TouchAction::PointerDown => {
                    self.pinch.lock().begin(&event.points);
                    Ok(GestureOutcome::SpacingRecorded)
                }
                TouchAction::Move => self.zoom(device.as_ref(), event),
                _ => Ok(GestureOutcome::Ignored),
            }
        } else if event.action == TouchAction::Up {
            let Some(point) = event.points.first() else {
                return Ok(GestureOutcome::Ignored);
            };
            self.focus(device, point.x, point.y, width, height)
        } else {
            Ok(GestureOutcome::Ignored)
        }
    }

    fn zoom(&self, device: &dyn CameraDevice, event: &TouchEvent) -> Result<GestureOutcome, GestureError> {
        let mut params = device.parameters()?;
        if !params.zoom_supported {
            return Ok(GestureOutcome::ZoomUnsupported);
        }
        device.cancel_auto_focus()?;

        let zoom = self
            .pinch
            .lock()
            .zoom(&event.points, params.zoom, params.max_zoom);
        params.zoom = zoom;
        device.set_parameters(&params)?;
        trace!(zoom, max = params.max_zoom, "Zoom applied");
        Ok(GestureOutcome::Zoomed(zoom))
    }

    fn focus(
        &self,
        device: Arc<dyn CameraDevice>,
        x: f32,
        y: f32,
        width: u32,
        height: u32,
    ) -> Result<GestureOutcome, GestureError> {
        let mut params = device.parameters()?;
        if !params.supports_focus_mode(FocusMode::Auto) || params.max_focus_areas == 0 {
            return Ok(GestureOutcome::FocusUnsupported);
        }
        device.cancel_auto_focus()?;

        let area = focus_area(x, y, width, height)?;
        params.focus_mode = Some(FocusMode::Auto);
        params.focus_areas = vec![area];
        if params.max_metering_areas > 0 {
            params.metering_areas = vec![area];
        }
        device.set_parameters(&params)?;

        let focused = Arc::clone(&device);
        let triggered = device.auto_focus(Box::new(move |success| {
            if success {
                if let Err(e) = focused.cancel_auto_focus() {
                    debug!(error = %e, "Cancel after autofocus failed");
                }
            }
        }));
        if let Err(e) = triggered {
            debug!(error = %e, "Autofocus failed");
        }

        trace!(?area, "Focus area applied");
        Ok(GestureOutcome::Focused)
    }
}
