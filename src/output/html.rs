//! HTML preview.
//!
//! When PDF output is suppressed the pages are written as PNGs next to
//! the output target, tied together by an HTML file sized in physical
//! millimeters so a browser's print preview matches the real sheet.

use std::fmt::Write as _;
use std::path::PathBuf;

use image::{RgbaImage, imageops};

use crate::config::Settings;
use crate::error::LabelError;
use crate::layout::{PageContent, SealedPage, Template};
use crate::render::mm_to_px;

use super::atomic_write;

/// Resolution preview pages are rasterized at. Screen preview does not
/// need print density.
const PREVIEW_DPI: u32 = 150;

/// Write one PNG per page plus an HTML index. Returns the paths written,
/// index first.
pub fn write_preview(
    pages: &[SealedPage],
    template: &Template,
    settings: &Settings,
) -> Result<Vec<PathBuf>, LabelError> {
    let (page_w_mm, page_h_mm) = template.page_size_mm();
    let html_path = settings.output.with_extension("html");
    let stem = settings
        .output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "labels".to_string());

    let mut written = vec![html_path.clone()];
    let mut body = String::new();

    for (i, page) in pages.iter().enumerate() {
        let raster = rasterize(page, page_w_mm, page_h_mm);
        let png_name = format!("{stem}_page{:03}.png", i + 1);
        let png_path = html_path.with_file_name(&png_name);

        atomic_write(&png_path, |file| {
            raster
                .write_to(file, image::ImageFormat::Png)
                .map_err(|e| LabelError::OutputWrite(format!("{}: {e}", png_path.display())))
        })?;
        written.push(png_path);

        let _ = writeln!(
            body,
            r#"  <div class="page"><img src="{png_name}" alt="page {}"></div>"#,
            i + 1
        );
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{stem}</title>
<style>
  @page {{ size: {page_w_mm}mm {page_h_mm}mm; margin: 0; }}
  body {{ margin: 0; }}
  .page {{
    width: {page_w_mm}mm;
    height: {page_h_mm}mm;
    page-break-after: always;
    overflow: hidden;
  }}
  .page img {{ width: 100%; height: 100%; }}
</style>
</head>
<body>
{body}</body>
</html>
"#
    );

    atomic_write(&html_path, |file| {
        use std::io::Write;
        file.write_all(html.as_bytes()).map_err(LabelError::from)
    })?;

    log::info!("wrote preview {}", html_path.display());
    Ok(written)
}

/// Flatten a page to an opaque preview raster.
fn rasterize(page: &SealedPage, page_w_mm: f32, page_h_mm: f32) -> RgbaImage {
    match &page.content {
        PageContent::Raster { image, .. } => image.clone(),
        PageContent::Overlay { placements, .. } => {
            let w = mm_to_px(page_w_mm, PREVIEW_DPI).max(1);
            let h = mm_to_px(page_h_mm, PREVIEW_DPI).max(1);
            let mut canvas = RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));

            for placement in placements {
                let lw = mm_to_px(placement.label.width_mm, PREVIEW_DPI).max(1);
                let lh = mm_to_px(placement.label.height_mm, PREVIEW_DPI).max(1);
                let scaled = imageops::thumbnail(&placement.label.image, lw, lh);
                let x = mm_to_px(placement.x_mm, PREVIEW_DPI) as i64;
                let y = mm_to_px(placement.y_mm, PREVIEW_DPI) as i64;
                imageops::overlay(&mut canvas, &scaled, x, y);
            }
            canvas
        }
    }
}
