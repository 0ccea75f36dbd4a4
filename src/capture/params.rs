//! Camera parameter model.
//!
//! Mirrors the parameter block a camera driver exposes: supported modes
//! and sizes are read-only capabilities, the remaining fields are the
//! live settings written back with [`CameraDevice::set_parameters`].
//!
//! [`CameraDevice::set_parameters`]: super::CameraDevice::set_parameters

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which physical camera a handle drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    /// Rear-facing camera.
    #[default]
    Back,
    /// Front-facing camera.
    Front,
}

impl fmt::Display for CameraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Back => f.write_str("back"),
            Self::Front => f.write_str("front"),
        }
    }
}

/// Capture intent negotiated at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Still pictures; sizes come from the picture size list.
    #[default]
    Still,
    /// Continuous video; sizes come from the video size list.
    Video,
}

/// Focus modes a driver may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusMode {
    Auto,
    ContinuousPicture,
    ContinuousVideo,
    Infinity,
    Fixed,
    Macro,
}

impl FocusMode {
    /// Picks the focus mode for a capture mode.
    ///
    /// Prefers the continuous mode matching the capture intent and falls
    /// back to general auto focus. Returns `None` when neither is supported,
    /// in which case the driver default is kept.
    pub fn select(mode: CaptureMode, supported: &[FocusMode]) -> Option<FocusMode> {
        let continuous = match mode {
            CaptureMode::Still => FocusMode::ContinuousPicture,
            CaptureMode::Video => FocusMode::ContinuousVideo,
        };
        if supported.contains(&continuous) {
            Some(continuous)
        } else if supported.contains(&FocusMode::Auto) {
            Some(FocusMode::Auto)
        } else {
            None
        }
    }
}

/// Flash behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
    /// Continuous light, used for torch mode.
    Torch,
}

/// A width x height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel count.
    #[inline]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Returns the largest-area size that fits within `max_width` x `max_height`.
pub fn best_size(sizes: &[Size], max_width: u32, max_height: u32) -> Option<Size> {
    sizes
        .iter()
        .filter(|s| s.width <= max_width && s.height <= max_height)
        .max_by_key(|s| s.area())
        .copied()
}

/// Rectangle in the driver's area coordinate space (-1000..=1000 on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl AreaRect {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// A weighted focus or metering region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeteringArea {
    pub rect: AreaRect,
    /// 1..=1000
    pub weight: u32,
}

/// The full parameter block of an open camera.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CameraParameters {
    pub supported_focus_modes: Vec<FocusMode>,
    pub supported_picture_sizes: Vec<Size>,
    pub supported_video_sizes: Vec<Size>,
    pub focus_mode: Option<FocusMode>,
    pub picture_size: Size,
    pub preview_size: Size,
    pub zoom_supported: bool,
    pub zoom: u32,
    pub max_zoom: u32,
    pub max_focus_areas: u32,
    pub max_metering_areas: u32,
    pub focus_areas: Vec<MeteringArea>,
    pub metering_areas: Vec<MeteringArea>,
    pub flash_mode: FlashMode,
}

impl CameraParameters {
    /// Sizes advertised for the given capture mode.
    pub fn sizes_for(&self, mode: CaptureMode) -> &[Size] {
        match mode {
            CaptureMode::Still => &self.supported_picture_sizes,
            CaptureMode::Video => &self.supported_video_sizes,
        }
    }

    pub fn supports_focus_mode(&self, mode: FocusMode) -> bool {
        self.supported_focus_modes.contains(&mode)
    }
}
