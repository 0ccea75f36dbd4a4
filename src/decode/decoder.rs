//! Barcode decoder over luminance planes.

use super::symbology::{BarcodeFormat, SymbologySet};
use super::transform::LuminancePlane;
use super::QrReader;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors raised while decoding a single frame.
///
/// These never leave the frame pipeline; they surface as
/// [`DecodeResult::Error`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("luminance buffer holds {got} bytes, need {need}")]
    BufferTooSmall { got: usize, need: usize },
    #[error("{format} reader failed: {reason}")]
    Reader { format: BarcodeFormat, reason: String },
    #[error("{format} reader panicked")]
    ReaderPanicked { format: BarcodeFormat },
}

/// Read-only view of a luminance plane.
#[derive(Debug, Clone, Copy)]
pub struct LuminanceSource<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
}

impl<'a> LuminanceSource<'a> {
    /// Wraps the first `width * height` bytes of `data`.
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidDimensions { width, height });
        }
        let need = (width as usize) * (height as usize);
        let data = data.get(..need).ok_or(DecodeError::BufferTooSmall {
            got: data.len(),
            need,
        })?;
        Ok(Self {
            data,
            width: width as usize,
            height: height as usize,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Luminance at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &'a [u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }
}

/// A point on the symbol, in decoded-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultPoint {
    pub x: f32,
    pub y: f32,
}

impl ResultPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A successfully decoded symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeMatch {
    pub text: String,
    pub format: BarcodeFormat,
    /// Corner or finder points in reader order.
    pub points: Vec<ResultPoint>,
}

/// Outcome of decoding one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeResult {
    Matched(BarcodeMatch),
    NoMatch,
    Error(DecodeError),
}

impl DecodeResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// A symbology-specific reader.
pub trait SymbolReader: Send {
    /// Formats this reader can produce.
    fn formats(&self) -> &[BarcodeFormat];

    /// Attempts to read one symbol. `Ok(None)` means nothing was found.
    fn read(&mut self, source: &LuminanceSource<'_>) -> Result<Option<BarcodeMatch>, DecodeError>;

    /// Clears any per-frame state.
    fn reset(&mut self) {}
}

/// Long-lived decoder configured with the accepted symbologies.
///
/// Readers are tried in registration order; the first match wins. The
/// decoder is reset after every attempt whatever the outcome.
pub struct BarcodeDecoder {
    symbologies: SymbologySet,
    readers: Vec<Box<dyn SymbolReader>>,
    resets: u64,
}

impl BarcodeDecoder {
    /// Creates a decoder with every built-in reader the symbologies accept.
    pub fn new(symbologies: SymbologySet) -> Self {
        Self::with_readers(symbologies, vec![Box::new(QrReader::new())])
    }

    /// Creates a decoder from configuration names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self::new(SymbologySet::from_names(names))
    }

    /// Creates a decoder from explicit readers, keeping those the
    /// symbologies accept.
    pub fn with_readers(symbologies: SymbologySet, mut readers: Vec<Box<dyn SymbolReader>>) -> Self {
        readers.retain(|r| r.formats().iter().any(|f| symbologies.accepts(*f)));

        for format in symbologies.formats() {
            if !readers.iter().any(|r| r.formats().contains(format)) {
                debug!(%format, "No reader available for symbology");
            }
        }

        Self {
            symbologies,
            readers,
            resets: 0,
        }
    }

    pub fn symbologies(&self) -> &SymbologySet {
        &self.symbologies
    }

    /// Number of installed readers.
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Decodes one luminance plane. Never retries within a call.
    pub fn decode(&mut self, plane: &LuminancePlane) -> DecodeResult {
        let result = match LuminanceSource::new(&plane.data, plane.width, plane.height) {
            Ok(source) => self.attempt(&source),
            Err(e) => DecodeResult::Error(e),
        };
        self.reset();
        result
    }

    fn attempt(&mut self, source: &LuminanceSource<'_>) -> DecodeResult {
        let mut first_error = None;

        for reader in &mut self.readers {
            let format = reader.formats().first().copied().unwrap_or(BarcodeFormat::QrCode);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| reader.read(source)))
                .unwrap_or(Err(DecodeError::ReaderPanicked { format }));

            match outcome {
                Ok(Some(found)) if self.symbologies.accepts(found.format) => {
                    trace!(format = %found.format, points = found.points.len(), "Symbol decoded");
                    return DecodeResult::Matched(found);
                }
                Ok(Some(found)) => {
                    trace!(format = %found.format, "Symbol outside accepted set");
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(error = %e, "Reader failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => DecodeResult::Error(e),
            None => DecodeResult::NoMatch,
        }
    }

    /// Clears reader state.
    pub fn reset(&mut self) {
        for reader in &mut self.readers {
            reader.reset();
        }
        self.resets += 1;
    }

    /// Resets performed since creation.
    pub fn resets(&self) -> u64 {
        self.resets
    }
}

impl std::fmt::Debug for BarcodeDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarcodeDecoder")
            .field("symbologies", &self.symbologies)
            .field("readers", &self.readers.len())
            .field("resets", &self.resets)
            .finish()
    }
}
