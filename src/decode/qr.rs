//! QR code reader backed by `rqrr`.

use super::decoder::{BarcodeMatch, DecodeError, LuminanceSource, ResultPoint, SymbolReader};
use super::symbology::BarcodeFormat;
use tracing::{debug, trace};

/// Reads QR codes from a luminance plane.
///
/// `rqrr` binarizes the plane itself, so the reader keeps no state between
/// frames.
#[derive(Debug, Default)]
pub struct QrReader;

impl QrReader {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolReader for QrReader {
    fn formats(&self) -> &[BarcodeFormat] {
        &[BarcodeFormat::QrCode]
    }

    fn read(&mut self, source: &LuminanceSource<'_>) -> Result<Option<BarcodeMatch>, DecodeError> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            source.width(),
            source.height(),
            |x, y| source.pixel(x, y),
        );
        let grids = prepared.detect_grids();
        trace!(count = grids.len(), "QR grids detected");

        // A grid that was found but cannot be read is a corrupted symbol
        let mut failure = None;
        for grid in grids {
            match grid.decode() {
                Ok((_meta, text)) => {
                    // Corners in rqrr order: top-left, top-right, bottom-right, bottom-left
                    let points = grid
                        .bounds
                        .iter()
                        .map(|p| ResultPoint::new(p.x as f32, p.y as f32))
                        .collect();
                    return Ok(Some(BarcodeMatch {
                        text,
                        format: BarcodeFormat::QrCode,
                        points,
                    }));
                }
                Err(e) => {
                    debug!(error = ?e, "Failed to decode QR grid");
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(DecodeError::Reader {
                format: BarcodeFormat::QrCode,
                reason: format!("{e:?}"),
            }),
            None => Ok(None),
        }
    }
}
