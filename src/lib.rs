//! # Labelgen - CSV-Driven Label Sheet Generator
//!
//! Labelgen turns a CSV of codes into print-ready label sheets: each row
//! becomes a DataMatrix (or QR) code with optional text and logo, placed
//! on PDF or image templates and assembled into a multi-page PDF. It
//! provides:
//!
//! - **Layered configuration**: CLI flags over a JSON/INI file over
//!   built-in defaults
//! - **2D codes**: DataMatrix with QR fallback, chosen once per run
//! - **Composition**: millimeter-based layout rasterized per label
//! - **Template overlay**: one label per page, or a grid per sheet
//!
//! ## Quick Start
//!
//! ```no_run
//! use labelgen::config::{CliOverrides, FileConfig, resolve};
//! use labelgen::pipeline;
//! use std::path::PathBuf;
//!
//! let cli = CliOverrides {
//!     csv_file: Some(PathBuf::from("codes.csv")),
//!     output: Some(PathBuf::from("labels.pdf")),
//!     template_type: Some("single".into()),
//!     ..Default::default()
//! };
//! let settings = resolve(cli, FileConfig::default())?;
//! let summary = pipeline::run(&settings)?;
//! println!("{} labels on {} pages", summary.labels, summary.pages);
//! # Ok::<(), labelgen::LabelError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Settings resolution and validation |
//! | [`records`] | CSV reading and field slicing |
//! | [`encode`] | DataMatrix/QR module matrices |
//! | [`render`] | Label rasterization |
//! | [`layout`] | Templates and page placement |
//! | [`output`] | PDF and HTML preview writing |
//! | [`pipeline`] | End-to-end run orchestration |
//! | [`error`] | Error types |

pub mod config;
pub mod encode;
pub mod error;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod render;

// Re-exports for convenience
pub use config::Settings;
pub use error::LabelError;
pub use pipeline::{RunSummary, run};
