//! Preview frame delivered by the camera's frame callback.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Pixel layout of a preview buffer.
///
/// Every supported layout starts with a full-resolution luminance plane,
/// which is the only part consumed by decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Y plane followed by interleaved VU at quarter resolution.
    #[default]
    Nv21,
    /// Y plane followed by planar V and U at quarter resolution.
    Yv12,
    /// Luminance only.
    Gray8,
}

impl PixelFormat {
    /// Total buffer length for a frame of the given dimensions.
    pub fn buffer_len(&self, width: u32, height: u32) -> usize {
        let luma = (width as usize) * (height as usize);
        match self {
            Self::Nv21 | Self::Yv12 => luma + luma / 2,
            Self::Gray8 => luma,
        }
    }
}

/// A single raw preview frame.
///
/// The buffer is owned: the producer hands the frame off by value and must
/// not keep a reference to it.
#[derive(Clone)]
pub struct PreviewFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    timestamp: Instant,
    sequence: u64,
}

impl PreviewFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            format,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Creates a luminance-only frame.
    pub fn gray(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self::new(data, width, height, PixelFormat::Gray8, sequence)
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of bytes in the luminance plane (width * height).
    #[inline]
    pub fn luma_len(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// The luminance plane, if the buffer is large enough to hold it.
    pub fn luma(&self) -> Option<&[u8]> {
        self.data.get(..self.luma_len())
    }

    /// Consumes the frame, returning its buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Validates that the buffer matches the format and dimensions.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() >= self.format.buffer_len(self.width, self.height)
    }
}

impl std::fmt::Debug for PreviewFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("sequence", &self.sequence)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nv21_frame() {
        let frame = PreviewFrame::new(vec![0u8; 640 * 480 * 3 / 2], 640, 480, PixelFormat::Nv21, 1);
        assert!(frame.is_valid());
        assert_eq!(frame.luma().map(<[u8]>::len), Some(640 * 480));
    }

    #[test]
    fn test_short_buffer_invalid() {
        let frame = PreviewFrame::gray(vec![0u8; 100], 640, 480, 1);
        assert!(!frame.is_valid());
        assert!(frame.luma().is_none());
    }
}
