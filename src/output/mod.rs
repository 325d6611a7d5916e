//! # Document Assembly
//!
//! Writes sealed pages to their final artifacts: a multi-page PDF, or a
//! set of page PNGs with an HTML preview when PDF output is suppressed.
//! All writes go through a temp file in the destination directory that is
//! renamed into place, so a crash never leaves a truncated output behind.

pub mod html;
pub mod pdf;

pub use html::write_preview;
pub use pdf::write_pdf;

use std::io::Write;
use std::path::Path;

use crate::error::LabelError;

/// Write `path` atomically: the producer fills a temp file in the same
/// directory, which is renamed over the destination only on success.
pub fn atomic_write<F>(path: &Path, producer: F) -> Result<(), LabelError>
where
    F: FnOnce(&mut std::fs::File) -> Result<(), LabelError>,
{
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir),
        None => tempfile::NamedTempFile::new_in("."),
    }
    .map_err(|e| LabelError::OutputWrite(format!("{}: {e}", path.display())))?;

    producer(tmp.as_file_mut())?;
    tmp.as_file_mut()
        .flush()
        .map_err(|e| LabelError::OutputWrite(format!("{}: {e}", path.display())))?;

    tmp.persist(path)
        .map_err(|e| LabelError::OutputWrite(format!("{}: {}", path.display(), e.error)))?;
    Ok(())
}
