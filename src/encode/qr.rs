//! QR fallback backend, built on the `qrcode` crate with error correction
//! level L to maximize capacity for long GS1 payloads.

use qrcode::{Color, EcLevel, QrCode};

use super::{EncodedCode, Encoding};

/// The QR spec mandates a four-module quiet zone.
const QUIET_MODULES: usize = 4;

pub fn encode(data: &str) -> Result<EncodedCode, String> {
    let code =
        QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L).map_err(|e| e.to_string())?;

    let size = code.width();
    let mut modules = vec![false; size * size];
    for y in 0..size {
        for x in 0..size {
            modules[y * size + x] = code[(x, y)] == Color::Dark;
        }
    }

    Ok(EncodedCode::with_quiet_zone(
        size,
        size,
        modules,
        QUIET_MODULES,
        Encoding::Qr,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_square_with_quiet_zone() {
        let code = encode("https://example.com").unwrap();
        assert_eq!(code.width, code.height);
        assert_eq!(code.kind, Encoding::Qr);
        // Quiet zone rows are all light.
        for x in 0..code.width {
            assert!(!code.is_dark(x, 0));
            assert!(!code.is_dark(x, code.height - 1));
        }
    }

    #[test]
    fn test_over_capacity_fails() {
        // Version 40 at EC level L caps out below 3000 bytes.
        let huge = "x".repeat(5000);
        assert!(encode(&huge).is_err());
    }

    #[test]
    fn test_round_trip_through_reader() {
        let payload = "0108809687640804215!";
        let code = encode(payload).unwrap();
        let (luma, side) = super::super::rasterize_for_decode(&code);

        let result = rxing::helpers::detect_in_luma(
            luma,
            side,
            side,
            Some(rxing::BarcodeFormat::QR_CODE),
        )
        .unwrap();
        assert_eq!(result.getText().to_string(), payload);
    }
}
