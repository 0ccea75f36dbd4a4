//! Frame geometry for decoding.
//!
//! Camera sensors deliver landscape buffers. When the device is held in its
//! natural portrait orientation the luminance plane is rotated 90 degrees so
//! symbols appear upright to the decoder.

use crate::capture::PreviewFrame;
use serde::{Deserialize, Serialize};

/// Device orientation as reported by the platform's orientation sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeviceOrientation {
    /// Natural portrait (code 0).
    #[default]
    Portrait,
    /// Rotated a quarter turn left (code 1).
    LandscapeLeft,
    /// Upside down (code 2).
    PortraitUpsideDown,
    /// Rotated a quarter turn right (code 3).
    LandscapeRight,
    /// Any other code.
    Unknown(i32),
}

impl DeviceOrientation {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Portrait,
            1 => Self::LandscapeLeft,
            2 => Self::PortraitUpsideDown,
            3 => Self::LandscapeRight,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Portrait => 0,
            Self::LandscapeLeft => 1,
            Self::PortraitUpsideDown => 2,
            Self::LandscapeRight => 3,
            Self::Unknown(code) => *code,
        }
    }

    /// Whether frames must be rotated before decoding.
    ///
    /// Only natural portrait rotates. Upside-down portrait and the landscape
    /// orientations pass through untouched.
    pub fn requires_rotation(&self) -> bool {
        matches!(self, Self::Portrait)
    }
}

/// Rotates a row-major `width` x `height` luminance plane by 90 degrees.
///
/// The source pixel at `(x, y)` lands at index `x * height + height - y - 1`
/// of the result, which is `height` pixels wide and `width` pixels tall.
/// Returns the new buffer with the swapped dimensions.
///
/// # Panics
///
/// Panics if `plane` holds fewer than `width * height` bytes.
pub fn rotate90(plane: &[u8], width: u32, height: u32) -> (Vec<u8>, u32, u32) {
    let (w, h) = (width as usize, height as usize);
    let mut rotated = vec![0u8; w * h];

    for (y, row) in plane[..w * h].chunks_exact(w.max(1)).enumerate() {
        for (x, &pixel) in row.iter().enumerate() {
            rotated[x * h + h - y - 1] = pixel;
        }
    }

    (rotated, height, width)
}

/// A luminance plane ready for the decoder.
///
/// `data` may be longer than `width * height` (chroma planes of the
/// original frame are kept when no rotation was needed); only the first
/// `width * height` bytes are luminance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuminancePlane {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Applies the orientation transform to a frame, consuming it.
///
/// Without rotation the frame's buffer is moved through as-is. Returns
/// `None` if the frame is too small to hold its luminance plane.
pub fn orient_frame(frame: PreviewFrame, orientation: DeviceOrientation) -> Option<LuminancePlane> {
    let (width, height) = (frame.width(), frame.height());
    if frame.luma().is_none() {
        return None;
    }

    if orientation.requires_rotation() {
        let (data, width, height) = rotate90(frame.data(), width, height);
        Some(LuminancePlane { data, width, height })
    } else {
        Some(LuminancePlane {
            data: frame.into_data(),
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rotate_2x3() {
        // 0 1
        // 2 3
        // 4 5
        let plane = [0, 1, 2, 3, 4, 5];
        let (rotated, w, h) = rotate90(&plane, 2, 3);
        assert_eq!((w, h), (3, 2));
        // Clockwise quarter turn:
        // 4 2 0
        // 5 3 1
        assert_eq!(rotated, vec![4, 2, 0, 5, 3, 1]);
    }

    #[test]
    fn test_rotate_ignores_chroma() {
        let mut plane = vec![1, 2, 3, 4];
        plane.extend_from_slice(&[99, 99]);
        let (rotated, _, _) = rotate90(&plane, 2, 2);
        assert_eq!(rotated, vec![3, 1, 4, 2]);
    }

    #[test]
    fn test_orientation_codes() {
        assert!(DeviceOrientation::from_code(0).requires_rotation());
        for code in [1, 2, 3, 90, -1] {
            assert!(!DeviceOrientation::from_code(code).requires_rotation());
            assert_eq!(DeviceOrientation::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_orient_passthrough_keeps_buffer() {
        let frame = PreviewFrame::gray(vec![1, 2, 3, 4, 5, 6], 3, 2, 1);
        let plane = orient_frame(frame, DeviceOrientation::LandscapeLeft).unwrap();
        assert_eq!((plane.width, plane.height), (3, 2));
        assert_eq!(plane.data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_orient_rotates_portrait() {
        let frame = PreviewFrame::gray(vec![0, 1, 2, 3, 4, 5], 2, 3, 1);
        let plane = orient_frame(frame, DeviceOrientation::Portrait).unwrap();
        assert_eq!((plane.width, plane.height), (3, 2));
        assert_eq!(plane.data, vec![4, 2, 0, 5, 3, 1]);
    }

    #[test]
    fn test_orient_rejects_short_frame() {
        let frame = PreviewFrame::gray(vec![0; 3], 2, 3, 1);
        assert!(orient_frame(frame, DeviceOrientation::Portrait).is_none());
    }

    fn plane_strategy() -> impl Strategy<Value = (Vec<u8>, u32, u32)> {
        (1u32..24, 1u32..24).prop_flat_map(|(w, h)| {
            (
                proptest::collection::vec(any::<u8>(), (w * h) as usize),
                Just(w),
                Just(h),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_rotate_swaps_dimensions((plane, w, h) in plane_strategy()) {
            let (rotated, rw, rh) = rotate90(&plane, w, h);
            prop_assert_eq!((rw, rh), (h, w));
            prop_assert_eq!(rotated.len(), plane.len());
        }

        #[test]
        fn prop_double_rotation_is_half_turn((plane, w, h) in plane_strategy()) {
            let (once, w1, h1) = rotate90(&plane, w, h);
            let (twice, w2, h2) = rotate90(&once, w1, h1);
            prop_assert_eq!((w2, h2), (w, h));

            let (w, h) = (w as usize, h as usize);
            for y in 0..h {
                for x in 0..w {
                    let mirrored = (h - 1 - y) * w + (w - 1 - x);
                    prop_assert_eq!(twice[mirrored], plane[y * w + x]);
                }
            }
        }

        #[test]
        fn prop_four_rotations_restore_frame((plane, w, h) in plane_strategy()) {
            let mut current = (plane.clone(), w, h);
            for _ in 0..4 {
                current = rotate90(&current.0, current.1, current.2);
            }
            prop_assert_eq!(current, (plane, w, h));
        }
    }
}
