//! # Code Encoder
//!
//! Turns a payload string into a 2D code module grid. DataMatrix
//! (ISO/IEC 16022) is preferred; when the `datamatrix` feature is compiled
//! out the encoder transparently falls back to QR for the whole run. The
//! decision is made once at startup and cached, with a single warning, not
//! re-evaluated per call.

mod qr;

#[cfg(feature = "datamatrix")]
mod dm;

use std::sync::Once;

use crate::error::LabelError;

/// Which symbology produced an [`EncodedCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    DataMatrix,
    Qr,
}

/// A rendered module grid, quiet zone included. `true` is a dark module.
#[derive(Debug, Clone)]
pub struct EncodedCode {
    pub width: usize,
    pub height: usize,
    pub modules: Vec<bool>,
    pub kind: Encoding,
}

impl EncodedCode {
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }

    /// Wrap a bare module grid in a quiet zone of the given width.
    pub(crate) fn with_quiet_zone(
        width: usize,
        height: usize,
        modules: Vec<bool>,
        quiet: usize,
        kind: Encoding,
    ) -> EncodedCode {
        let out_w = width + 2 * quiet;
        let out_h = height + 2 * quiet;
        let mut out = vec![false; out_w * out_h];
        for y in 0..height {
            for x in 0..width {
                out[(y + quiet) * out_w + (x + quiet)] = modules[y * width + x];
            }
        }
        EncodedCode {
            width: out_w,
            height: out_h,
            modules: out,
            kind,
        }
    }
}

static FALLBACK_WARNING: Once = Once::new();

/// Encoder with the backend fixed for the run's duration.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    kind: Encoding,
}

impl Encoder {
    /// Probe backend availability once and pin the symbology.
    pub fn probe() -> Encoder {
        #[cfg(feature = "datamatrix")]
        {
            Encoder {
                kind: Encoding::DataMatrix,
            }
        }
        #[cfg(not(feature = "datamatrix"))]
        {
            FALLBACK_WARNING.call_once(|| {
                log::warn!("DataMatrix backend unavailable, using QR codes for this run");
            });
            Encoder { kind: Encoding::Qr }
        }
    }

    /// Force the QR backend regardless of what is compiled in.
    pub fn qr_only() -> Encoder {
        FALLBACK_WARNING.call_once(|| {
            log::warn!("DataMatrix backend unavailable, using QR codes for this run");
        });
        Encoder { kind: Encoding::Qr }
    }

    pub fn kind(&self) -> Encoding {
        self.kind
    }

    /// Encode one payload. Empty and over-capacity payloads are
    /// recoverable errors carrying the row number.
    pub fn encode(&self, data: &str, row: usize) -> Result<EncodedCode, LabelError> {
        if data.is_empty() {
            return Err(LabelError::Encoding {
                row,
                reason: "empty payload".into(),
            });
        }

        match self.kind {
            Encoding::Qr => qr::encode(data).map_err(|reason| LabelError::Encoding { row, reason }),
            #[cfg(feature = "datamatrix")]
            Encoding::DataMatrix => {
                dm::encode(data).map_err(|reason| LabelError::Encoding { row, reason })
            }
            #[cfg(not(feature = "datamatrix"))]
            Encoding::DataMatrix => unreachable!("DataMatrix backend not compiled in"),
        }
    }
}

/// Render a module grid to an 8-bit grayscale square for decoder checks:
/// 4 pixels per module, dark = 0, padded to a square with white.
#[cfg(test)]
pub(crate) fn rasterize_for_decode(code: &EncodedCode) -> (Vec<u8>, u32) {
    const SCALE: usize = 4;
    let side = code.width.max(code.height) * SCALE;
    let mut luma = vec![255u8; side * side];
    for y in 0..code.height {
        for x in 0..code.width {
            if !code.is_dark(x, y) {
                continue;
            }
            for dy in 0..SCALE {
                for dx in 0..SCALE {
                    luma[(y * SCALE + dy) * side + x * SCALE + dx] = 0;
                }
            }
        }
    }
    (luma, side as u32)
}
