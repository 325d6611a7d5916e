//! Label composition.
//!
//! One label is the set of drawn elements for one CSV record: the 2D code,
//! an optional text fragment, and an optional logo. Elements are laid out
//! in millimeters within the label cell (the full page in single mode, one
//! grid cell in multiple mode), then rasterized together into a tight RGBA
//! canvas anchored at the top-left of the union of their bounds.

use image::{Rgba, RgbaImage, imageops};
use std::path::Path;

use super::font::{FontSource, wrap_text};
use super::mm_to_px;
use crate::config::{CodePosition, CodeSpec, Settings, TextSpec};
use crate::encode::EncodedCode;
use crate::error::LabelError;
use crate::records::{CsvRecord, short_code, slice_fragment};

/// Gap between the code and a below-code text line, in mm.
const TEXT_GAP_MM: f32 = 1.0;

/// Gap between stacked side-text lines, in mm.
const LINE_GAP_MM: f32 = 0.5;

/// A finished label raster with its physical placement inside the cell.
#[derive(Debug)]
pub struct Label {
    pub image: RgbaImage,
    /// Anchor within the cell, mm from the cell's top-left corner.
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

#[derive(Debug, Clone, Copy)]
struct RectMm {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

enum Element {
    Code(RectMm),
    Logo(RectMm),
    Text { rect: RectMm, line: String },
}

impl Element {
    fn rect(&self) -> RectMm {
        match self {
            Element::Code(r) | Element::Logo(r) => *r,
            Element::Text { rect, .. } => *rect,
        }
    }
}

/// Renders labels for the run. Created once; the font and logo are loaded
/// up front and shared across records.
pub struct LabelComposer {
    dpi: u32,
    cell_w_mm: f32,
    cell_h_mm: f32,
    margin_mm: f32,
    code: CodeSpec,
    text: TextSpec,
    transparent: bool,
    font: FontSource,
    logo: Option<RgbaImage>,
    logo_height_mm: f32,
}

impl LabelComposer {
    /// Build a composer for cells of the given size, rasterizing at `dpi`.
    ///
    /// A missing logo file is not fatal: it is logged once and the logo is
    /// omitted from every label.
    pub fn new(settings: &Settings, cell_w_mm: f32, cell_h_mm: f32, dpi: u32) -> LabelComposer {
        let logo = if settings.logo.enabled {
            load_logo(&settings.logo.path)
        } else {
            None
        };

        LabelComposer {
            dpi,
            cell_w_mm,
            cell_h_mm,
            margin_mm: settings.margin_mm,
            code: settings.code.clone(),
            text: settings.text.clone(),
            transparent: settings.transparent_bg,
            font: FontSource::load_default(),
            logo,
            logo_height_mm: settings.logo.height_mm,
        }
    }

    /// Resolution labels are rasterized at.
    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Render one record's label.
    pub fn compose(&self, code: &EncodedCode, record: &CsvRecord) -> Result<Label, LabelError> {
        let payload = record.field(self.code.column)?;
        let code_rect = self.code_rect(code);

        let mut elements = vec![Element::Code(code_rect)];

        if let Some(logo) = &self.logo {
            let h = self.logo_height_mm;
            let w = h * logo.width() as f32 / logo.height() as f32;
            elements.push(Element::Logo(RectMm {
                x: self.margin_mm,
                y: self.margin_mm,
                w,
                h,
            }));
        }

        self.layout_text(record, payload, code_rect, &mut elements)?;

        // Union of element bounds becomes the label canvas.
        let min_x = elements.iter().map(|e| e.rect().x).fold(f32::MAX, f32::min);
        let min_y = elements.iter().map(|e| e.rect().y).fold(f32::MAX, f32::min);
        let max_x = elements
            .iter()
            .map(|e| e.rect().x + e.rect().w)
            .fold(f32::MIN, f32::max);
        let max_y = elements
            .iter()
            .map(|e| e.rect().y + e.rect().h)
            .fold(f32::MIN, f32::max);

        let width_mm = max_x - min_x;
        let height_mm = max_y - min_y;
        let w_px = mm_to_px(width_mm, self.dpi).max(1);
        let h_px = mm_to_px(height_mm, self.dpi).max(1);

        let background = if self.transparent {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([255, 255, 255, 255])
        };
        let mut canvas = RgbaImage::from_pixel(w_px, h_px, background);

        for element in &elements {
            let rect = element.rect();
            let x0 = mm_to_px(rect.x - min_x, self.dpi);
            let y0 = mm_to_px(rect.y - min_y, self.dpi);
            let w = mm_to_px(rect.w, self.dpi).max(1);
            let h = mm_to_px(rect.h, self.dpi).max(1);

            match element {
                Element::Code(_) => self.draw_code(&mut canvas, code, x0, y0, w, h),
                Element::Logo(_) => {
                    if let Some(logo) = &self.logo {
                        let scaled = imageops::resize(logo, w, h, imageops::FilterType::Lanczos3);
                        imageops::overlay(&mut canvas, &scaled, x0 as i64, y0 as i64);
                    }
                }
                Element::Text { line, .. } => self.draw_text(&mut canvas, line, x0, y0),
            }
        }

        Ok(Label {
            image: canvas,
            x_mm: min_x,
            y_mm: min_y,
            width_mm,
            height_mm,
        })
    }

    /// Physical rect of the code within the cell. `size_mm * scale` caps
    /// the larger side; the other follows the symbol's aspect ratio.
    fn code_rect(&self, code: &EncodedCode) -> RectMm {
        let side = self.code.size_mm * self.code.scale;
        let (w, h) = if code.width >= code.height {
            (side, side * code.height as f32 / code.width as f32)
        } else {
            (side * code.width as f32 / code.height as f32, side)
        };

        let (x, y) = match (self.code.x_mm, self.code.y_mm) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                let m = self.code.margin_mm;
                match self.code.position {
                    CodePosition::BottomRight => (self.cell_w_mm - w - m, self.cell_h_mm - h - m),
                    CodePosition::BottomLeft => (m, self.cell_h_mm - h - m),
                    CodePosition::TopRight => (self.cell_w_mm - w - m, m),
                    CodePosition::TopLeft => (m, m),
                }
            }
        };

        RectMm { x, y, w, h }
    }

    /// Select and place the text fragment, if any is configured.
    fn layout_text(
        &self,
        record: &CsvRecord,
        payload: &str,
        code_rect: RectMm,
        elements: &mut Vec<Element>,
    ) -> Result<(), LabelError> {
        let spec: &TextSpec = &self.text;

        let fragment = match spec.column {
            Some(column) => Some(slice_fragment(record.field(column)?, spec.start, spec.length)),
            None if spec.below_code => Some(short_code(payload)),
            None => None,
        };
        let Some(fragment) = fragment else {
            return Ok(());
        };
        if fragment.is_empty() {
            return Ok(());
        }

        let px_height = spec.font_size / 72.0 * self.dpi as f32;
        let line_h_mm = px_to_mm_f(self.font.line_height(px_height) as f32, self.dpi);

        if spec.below_code {
            // Single line centered under the code, ellipsis-free.
            let w_mm = px_to_mm_f(self.font.measure(&fragment, px_height), self.dpi);
            let mut x = code_rect.x + (code_rect.w - w_mm) / 2.0 + spec.offset_x_mm;
            if w_mm > code_rect.w {
                // Wider than the code: keep it inside the cell.
                x = x.min(self.cell_w_mm - w_mm).max(0.0);
            }
            let y = code_rect.y + code_rect.h + TEXT_GAP_MM + spec.offset_y_mm;
            elements.push(Element::Text {
                rect: RectMm {
                    x,
                    y,
                    w: w_mm,
                    h: line_h_mm,
                },
                line: fragment,
            });
            return Ok(());
        }

        // Side text: the product-name line, wrapped to at most two lines.
        if spec.no_product_name {
            return Ok(());
        }
        let x = spec.offset_x_mm;
        let max_w_mm = (self.cell_w_mm - x - self.margin_mm).max(1.0);
        let max_w_px = max_w_mm * self.dpi as f32 / 25.4;
        let lines = wrap_text(&fragment, max_w_px, &self.font, px_height, 2);
        for (i, line) in lines.into_iter().enumerate() {
            let w_mm = px_to_mm_f(self.font.measure(&line, px_height), self.dpi);
            elements.push(Element::Text {
                rect: RectMm {
                    x,
                    y: spec.offset_y_mm + i as f32 * (line_h_mm + LINE_GAP_MM),
                    w: w_mm,
                    h: line_h_mm,
                },
                line,
            });
        }
        Ok(())
    }

    /// Draw the module grid into the target rect with nearest sampling, so
    /// modules stay crisp at any scale.
    fn draw_code(
        &self,
        canvas: &mut RgbaImage,
        code: &EncodedCode,
        x0: u32,
        y0: u32,
        w: u32,
        h: u32,
    ) {
        for dy in 0..h {
            for dx in 0..w {
                let sx = (dx as usize * code.width) / w as usize;
                let sy = (dy as usize * code.height) / h as usize;
                let dark = code.is_dark(sx.min(code.width - 1), sy.min(code.height - 1));

                let (x, y) = (x0 + dx, y0 + dy);
                if x >= canvas.width() || y >= canvas.height() {
                    continue;
                }
                if dark {
                    canvas.put_pixel(x, y, Rgba([0, 0, 0, 255]));
                } else if !self.transparent {
                    canvas.put_pixel(x, y, Rgba([255, 255, 255, 255]));
                }
                // Light modules stay transparent on a transparent canvas,
                // letting the template show through.
            }
        }
    }

    /// Blend one rasterized text line onto the canvas.
    fn draw_text(&self, canvas: &mut RgbaImage, line: &str, x0: u32, y0: u32) {
        let px_height = self.text.font_size / 72.0 * self.dpi as f32;
        let raster = self.font.render_line(line, px_height);
        let [r, g, b] = self.text.color;

        for y in 0..raster.height {
            for x in 0..raster.width {
                let coverage = raster.data[y * raster.width + x];
                if coverage <= 0.0 {
                    continue;
                }
                let (cx, cy) = (x0 + x as u32, y0 + y as u32);
                if cx >= canvas.width() || cy >= canvas.height() {
                    continue;
                }
                let alpha = (coverage * 255.0) as u8;
                let ink = Rgba([r, g, b, alpha]);
                let mut base = *canvas.get_pixel(cx, cy);
                blend_over(&mut base, ink);
                canvas.put_pixel(cx, cy, base);
            }
        }
    }
}

fn px_to_mm_f(px: f32, dpi: u32) -> f32 {
    px * 25.4 / dpi as f32
}

/// Source-over blend of `top` onto `base`.
fn blend_over(base: &mut Rgba<u8>, top: Rgba<u8>) {
    let ta = top.0[3] as f32 / 255.0;
    let ba = base.0[3] as f32 / 255.0;
    let out_a = ta + ba * (1.0 - ta);
    if out_a <= 0.0 {
        *base = Rgba([0, 0, 0, 0]);
        return;
    }
    for i in 0..3 {
        let tc = top.0[i] as f32;
        let bc = base.0[i] as f32;
        base.0[i] = ((tc * ta + bc * ba * (1.0 - ta)) / out_a).round() as u8;
    }
    base.0[3] = (out_a * 255.0).round() as u8;
}

fn load_logo(path: &Path) -> Option<RgbaImage> {
    if !path.is_file() {
        log::warn!("logo file not found: {}, omitting logo", path.display());
        return None;
    }
    match image::open(path) {
        Ok(img) => Some(img.to_rgba8()),
        Err(e) => {
            log::warn!("cannot load logo {}: {e}, omitting logo", path.display());
            None
        }
    }
}
