//! Barcode decoding of preview frames.
//!
//! Frames pass through three stages:
//!
//! ```text
//! FrameDecodeGate → orient_frame (rotate90) → BarcodeDecoder
//! ```
//!
//! The gate bounds work to one in-flight decode, the transform puts the
//! luminance plane upright, and the decoder tries each configured reader.

mod decoder;
mod gate;
mod qr;
mod symbology;
mod transform;

pub use decoder::{
    BarcodeDecoder, BarcodeMatch, DecodeError, DecodeResult, LuminanceSource, ResultPoint,
    SymbolReader,
};
pub use gate::{FrameDecodeGate, GatePermit};
pub use qr::QrReader;
pub use symbology::{BarcodeFormat, SymbologySet};
pub use transform::{orient_frame, rotate90, DeviceOrientation, LuminancePlane};
