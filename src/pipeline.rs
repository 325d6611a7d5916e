//! # Run Pipeline
//!
//! End-to-end orchestration of one generation run: read the CSV, encode
//! and compose labels in parallel, place them on pages in record order,
//! and write the output document. Recoverable per-row failures are logged
//! and tallied; infrastructure failures abort the run.

use rayon::prelude::*;

use crate::config::{Settings, TemplateType};
use crate::encode::{Encoder, Encoding};
use crate::error::LabelError;
use crate::layout::{OverlayEngine, Template};
use crate::output::{write_pdf, write_preview};
use crate::records::RecordReader;
use crate::render::{Label, LabelComposer};

/// Tallies reported after a completed run.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub rows_read: usize,
    pub labels: usize,
    pub skipped: usize,
    pub pages: usize,
    pub encoding: Encoding,
}

/// Execute one run with resolved settings.
pub fn run(settings: &Settings) -> Result<RunSummary, LabelError> {
    let encoder = Encoder::probe();
    let template = Template::load(settings)?;

    let (page_w_mm, page_h_mm) = template.page_size_mm();
    let (cell_w_mm, cell_h_mm) = match (settings.template_type, &settings.grid) {
        (TemplateType::Multiple, Some(grid)) => grid.cell_mm(page_w_mm, page_h_mm),
        _ => (page_w_mm, page_h_mm),
    };
    let dpi = template.compose_dpi(settings);
    let composer = LabelComposer::new(settings, cell_w_mm, cell_h_mm, dpi);
    log::debug!(
        "run: page {page_w_mm:.1}x{page_h_mm:.1}mm, cell {cell_w_mm:.1}x{cell_h_mm:.1}mm, \
         compose at {dpi} dpi"
    );

    let reader = RecordReader::open(&settings.csv_file, settings.delimiter)?;
    let mut rows_read = 0;
    let mut skipped = 0;
    let mut records = Vec::new();
    for result in reader {
        rows_read += 1;
        match result {
            Ok(record) => records.push(record),
            Err(e) if e.is_recoverable() => {
                log::warn!("skipping row: {e}");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    log::info!("read {rows_read} rows from {}", settings.csv_file.display());

    // Encode and compose in parallel; collect keeps results in record
    // order for placement.
    let labels: Vec<Result<Label, LabelError>> = records
        .par_iter()
        .map(|record| {
            let payload = record.field(settings.code.column)?;
            let code = encoder.encode(payload, record.row)?;
            composer.compose(&code, record)
        })
        .collect();

    let mut engine = OverlayEngine::new(&template, settings);
    let mut placed = 0;
    for result in labels {
        match result {
            Ok(label) => {
                engine.place(label)?;
                placed += 1;
            }
            Err(e) if e.is_recoverable() => {
                log::warn!("skipping row: {e}");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    let pages = engine.finish();

    if settings.no_pdf {
        write_preview(&pages, &template, settings)?;
    } else {
        write_pdf(&pages, &template, settings)?;
    }

    let summary = RunSummary {
        rows_read,
        labels: placed,
        skipped,
        pages: pages.len(),
        encoding: encoder.kind(),
    };
    log::info!(
        "{} labels on {} pages ({} rows skipped)",
        summary.labels,
        summary.pages,
        summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CodePosition, CodeSpec, LogoSpec, TextSpec};
    use std::io::Write;
    use std::path::PathBuf;

    fn write_csv(dir: &std::path::Path, lines: &[&str]) -> PathBuf {
        let path = dir.join("data.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    fn settings(csv_file: PathBuf, output: PathBuf) -> Settings {
        Settings {
            csv_file,
            output,
            page_width_mm: 30.0,
            page_height_mm: 20.0,
            margin_mm: 2.0,
            dpi: 150,
            delimiter: b'\t',
            template: None,
            template_type: TemplateType::Single,
            code: CodeSpec {
                x_mm: None,
                y_mm: None,
                position: CodePosition::BottomRight,
                size_mm: 15.0,
                margin_mm: 2.0,
                scale: 1.0,
                column: 0,
            },
            text: TextSpec {
                column: None,
                start: 0,
                length: None,
                font_size: 12.0,
                offset_x_mm: 5.0,
                offset_y_mm: 0.0,
                color: [0, 0, 0],
                below_code: false,
                no_product_name: false,
            },
            grid: None,
            logo: LogoSpec {
                path: PathBuf::from("eac.png"),
                height_mm: 5.0,
                enabled: false,
            },
            no_pdf: false,
            transparent_bg: false,
        }
    }

    #[test]
    fn test_run_produces_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), &["0104607xyz123", "0104607xyz456"]);
        let output = dir.path().join("labels.pdf");

        let summary = run(&settings(csv, output.clone())).unwrap();
        assert_eq!(summary.rows_read, 2);
        assert_eq!(summary.labels, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.pages, 2);
        assert!(std::fs::read(&output).unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn test_run_skips_rows_missing_code_column() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), &["code-a\tname-a", "code-b"]);
        let output = dir.path().join("labels.pdf");

        let mut settings = settings(csv, output);
        settings.code.column = 1;

        let summary = run(&settings).unwrap();
        assert_eq!(summary.rows_read, 2);
        assert_eq!(summary.labels, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_run_missing_csv_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(
            dir.path().join("missing.csv"),
            dir.path().join("labels.pdf"),
        );
        let err = run(&settings).unwrap_err();
        assert!(matches!(err, LabelError::FileAccess { .. }));
    }

    #[test]
    fn test_run_preview_mode() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), &["0104607xyz123"]);
        let output = dir.path().join("labels.pdf");

        let mut settings = settings(csv, output);
        settings.no_pdf = true;

        let summary = run(&settings).unwrap();
        assert_eq!(summary.labels, 1);
        assert!(dir.path().join("labels.html").exists());
        assert!(dir.path().join("labels_page001.png").exists());
    }
}
