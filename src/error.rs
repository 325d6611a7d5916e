//! # Error Types
//!
//! This module defines error types used throughout the labelgen library.
//!
//! Errors fall into two classes: fatal errors abort the run before any
//! output is published, recoverable errors skip the offending CSV row and
//! are tallied in the run summary.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for labelgen operations
#[derive(Debug, Error)]
pub enum LabelError {
    /// Invalid or incomplete configuration (fatal, pre-run)
    #[error("Config error: {0}")]
    Config(String),

    /// An input file could not be opened (fatal)
    #[error("Cannot open {path}: {source}")]
    FileAccess {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The page template could not be loaded (fatal)
    #[error("Template error: {0}")]
    TemplateLoad(String),

    /// A CSV row does not have enough columns (recoverable, row is skipped)
    #[error("Row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    /// A payload could not be encoded as a 2D code (recoverable, row is skipped)
    #[error("Row {row}: encoding failed: {reason}")]
    Encoding { row: usize, reason: String },

    /// The output document could not be written (fatal)
    #[error("Output write error: {0}")]
    OutputWrite(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error wrapper
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl LabelError {
    /// Whether the pipeline may skip the current record and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LabelError::MalformedRow { .. } | LabelError::Encoding { .. }
        )
    }
}
