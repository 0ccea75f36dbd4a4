//! Touch-to-focus area computation.

use super::GestureError;
use crate::capture::{AreaRect, MeteringArea};

/// Bound of the driver's area coordinate space on each axis.
pub const AREA_COORDINATE_MAX: i32 = 1000;

/// Side of the square focus area, in driver coordinates.
pub const FOCUS_AREA_SIZE: i32 = 100;

/// Weight given to a touch-derived focus area.
pub const FOCUS_AREA_WEIGHT: u32 = 1000;

/// Maps a touch point on a `width` x `height` surface to a focus area.
///
/// The point is scaled into `[-1000, 1000]` on both axes and a
/// [`FOCUS_AREA_SIZE`] square is centred on it, shifted to stay inside the
/// coordinate space.
pub fn focus_area(x: f32, y: f32, width: u32, height: u32) -> Result<MeteringArea, GestureError> {
    let out_of_bounds = || GestureError::OutOfBounds {
        x,
        y,
        width,
        height,
    };
    if width == 0 || height == 0 || !x.is_finite() || !y.is_finite() {
        return Err(out_of_bounds());
    }
    if x < 0.0 || y < 0.0 || x > width as f32 || y > height as f32 {
        return Err(out_of_bounds());
    }

    let span = 2.0 * AREA_COORDINATE_MAX as f32;
    let center_x = (x / width as f32 * span - AREA_COORDINATE_MAX as f32).round() as i32;
    let center_y = (y / height as f32 * span - AREA_COORDINATE_MAX as f32).round() as i32;

    let half = FOCUS_AREA_SIZE / 2;
    let left = (center_x - half).clamp(-AREA_COORDINATE_MAX, AREA_COORDINATE_MAX - FOCUS_AREA_SIZE);
    let top = (center_y - half).clamp(-AREA_COORDINATE_MAX, AREA_COORDINATE_MAX - FOCUS_AREA_SIZE);

    Ok(MeteringArea {
        rect: AreaRect {
            left,
            top,
            right: left + FOCUS_AREA_SIZE,
            bottom: top + FOCUS_AREA_SIZE,
        },
        weight: FOCUS_AREA_WEIGHT,
    })
}
