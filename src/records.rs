//! # CSV Record Reader
//!
//! Lazy reader over a delimiter-separated input file. Quoting follows the
//! usual RFC4180 rules: a quoted field may contain the delimiter verbatim
//! and embedded quotes are escaped by doubling. Rows with too few columns
//! are a recoverable error decided by the caller; an unopenable file is
//! fatal.

use std::fs::File;
use std::path::Path;

use crate::error::LabelError;

/// One parsed CSV row. Row numbers are 1-based, matching what a user sees
/// in a text editor.
#[derive(Debug, Clone)]
pub struct CsvRecord {
    pub row: usize,
    pub fields: Vec<String>,
}

impl CsvRecord {
    /// Fetch a column, or a `MalformedRow` error naming the shortfall.
    pub fn field(&self, index: usize) -> Result<&str, LabelError> {
        self.fields
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| LabelError::MalformedRow {
                row: self.row,
                reason: format!(
                    "not enough columns (found {}, need {})",
                    self.fields.len(),
                    index + 1
                ),
            })
    }
}

/// Lazy iterator of [`CsvRecord`]s. Restartable by reopening the file.
pub struct RecordReader {
    inner: csv::StringRecordsIntoIter<File>,
    row: usize,
}

impl std::fmt::Debug for RecordReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordReader")
            .field("row", &self.row)
            .finish_non_exhaustive()
    }
}

impl RecordReader {
    /// Open the input file with the configured delimiter.
    pub fn open(path: &Path, delimiter: u8) -> Result<RecordReader, LabelError> {
        let file = File::open(path).map_err(|source| LabelError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;

        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        Ok(RecordReader {
            inner: reader.into_records(),
            row: 0,
        })
    }
}

impl Iterator for RecordReader {
    type Item = Result<CsvRecord, LabelError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.inner.next()?;
        self.row += 1;
        let row = self.row;

        Some(match record {
            Ok(record) => Ok(CsvRecord {
                row,
                fields: record.iter().map(|f| f.to_string()).collect(),
            }),
            Err(e) => Err(LabelError::MalformedRow {
                row,
                reason: e.to_string(),
            }),
        })
    }
}

/// Derive the short human-readable code printed next to the 2D code:
/// trailing `=` padding stripped, last 8 characters.
pub fn short_code(payload: &str) -> String {
    let trimmed = payload.trim_end_matches('=');
    let chars: Vec<char> = trimmed.chars().collect();
    let start = chars.len().saturating_sub(8);
    chars[start..].iter().collect()
}

/// Slice a text fragment out of a field by character offset and length.
pub fn slice_fragment(field: &str, start: usize, length: Option<usize>) -> String {
    let iter = field.chars().skip(start);
    match length {
        Some(len) => iter.take(len).collect(),
        None => iter.collect(),
    }
}
