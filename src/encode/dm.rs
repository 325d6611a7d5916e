//! DataMatrix backend. Symbol size follows the standard ISO/IEC 16022
//! sizing algorithm via `SymbolList::default()`.

use datamatrix::{DataMatrix, SymbolList};

use super::{EncodedCode, Encoding};

/// ISO/IEC 16022 requires a one-module quiet zone; we leave a little more
/// headroom so aggressive print scaling keeps the zone intact.
const QUIET_MODULES: usize = 2;

pub fn encode(data: &str) -> Result<EncodedCode, String> {
    let encoded = DataMatrix::encode(data.as_bytes(), SymbolList::default())
        .map_err(|e| format!("{e:?}"))?;

    let bitmap = encoded.bitmap();
    let (width, height) = (bitmap.width(), bitmap.height());
    let mut modules = vec![false; width * height];
    for (x, y) in bitmap.pixels() {
        modules[y * width + x] = true;
    }

    Ok(EncodedCode::with_quiet_zone(
        width,
        height,
        modules,
        QUIET_MODULES,
        Encoding::DataMatrix,
    ))
}
