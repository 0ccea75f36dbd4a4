//! Barcode symbologies and their configuration names.

use std::collections::BTreeSet;
use std::fmt;
use tracing::warn;

/// A barcode encoding standard.
///
/// Displays as the upper-case name reported in barcode read events,
/// e.g. `QR_CODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BarcodeFormat {
    Aztec,
    Codabar,
    Code39,
    Code93,
    Code128,
    DataMatrix,
    Ean8,
    Ean13,
    Itf,
    Maxicode,
    Pdf417,
    QrCode,
    Rss14,
    RssExpanded,
    UpcA,
    UpcE,
    UpcEanExtension,
}

impl BarcodeFormat {
    pub const ALL: [BarcodeFormat; 17] = [
        Self::Aztec,
        Self::Codabar,
        Self::Code39,
        Self::Code93,
        Self::Code128,
        Self::DataMatrix,
        Self::Ean8,
        Self::Ean13,
        Self::Itf,
        Self::Maxicode,
        Self::Pdf417,
        Self::QrCode,
        Self::Rss14,
        Self::RssExpanded,
        Self::UpcA,
        Self::UpcE,
        Self::UpcEanExtension,
    ];

    /// Maps a lowercase configuration name to a format.
    pub fn from_config_name(name: &str) -> Option<Self> {
        let format = match name {
            "aztec" => Self::Aztec,
            "ean13" => Self::Ean13,
            "ean8" => Self::Ean8,
            "qr" => Self::QrCode,
            "pdf417" => Self::Pdf417,
            "upce" => Self::UpcE,
            "datamatrix" => Self::DataMatrix,
            "code39" => Self::Code39,
            "code93" => Self::Code93,
            "interleaved2of5" => Self::Itf,
            "codabar" => Self::Codabar,
            "code128" => Self::Code128,
            "maxicode" => Self::Maxicode,
            "rss14" => Self::Rss14,
            "rssexpanded" => Self::RssExpanded,
            "upca" => Self::UpcA,
            "upceanextension" => Self::UpcEanExtension,
            _ => return None,
        };
        Some(format)
    }

    /// Name used in barcode read events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aztec => "AZTEC",
            Self::Codabar => "CODABAR",
            Self::Code39 => "CODE_39",
            Self::Code93 => "CODE_93",
            Self::Code128 => "CODE_128",
            Self::DataMatrix => "DATA_MATRIX",
            Self::Ean8 => "EAN_8",
            Self::Ean13 => "EAN_13",
            Self::Itf => "ITF",
            Self::Maxicode => "MAXICODE",
            Self::Pdf417 => "PDF_417",
            Self::QrCode => "QR_CODE",
            Self::Rss14 => "RSS_14",
            Self::RssExpanded => "RSS_EXPANDED",
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::UpcEanExtension => "UPC_EAN_EXTENSION",
        }
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of symbologies a decoder accepts, parsed from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbologySet {
    formats: BTreeSet<BarcodeFormat>,
    ignored: Vec<String>,
}

impl SymbologySet {
    /// Parses configuration names, dropping unrecognized ones with a warning.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut set = Self::default();
        for name in names {
            let name = name.as_ref();
            match BarcodeFormat::from_config_name(name) {
                Some(format) => {
                    set.formats.insert(format);
                }
                None => {
                    warn!(symbology = %name, "Unsupported barcode type ignored");
                    set.ignored.push(name.to_string());
                }
            }
        }
        set
    }

    /// Accepted formats. Empty means no restriction.
    pub fn formats(&self) -> &BTreeSet<BarcodeFormat> {
        &self.formats
    }

    /// Names that were dropped.
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    /// Whether `format` is accepted.
    pub fn accepts(&self, format: BarcodeFormat) -> bool {
        self.formats.is_empty() || self.formats.contains(&format)
    }
}
