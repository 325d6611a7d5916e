//! Text rasterization.
//!
//! The compositor prefers a TrueType font found on the system, rendered
//! with ab_glyph for anti-aliased output. When none can be loaded it falls
//! back to the built-in Spleen bitmap font, scaled nearest-neighbor, so a
//! missing font is never fatal.

use ab_glyph::{Font, FontArc, ScaleFont};
use spleen_font::{FONT_12X24, PSF2Font};
use std::path::Path;
use std::sync::Once;

/// Well-known TrueType locations, checked in order.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static FALLBACK_WARNING: Once = Once::new();

/// Native cell size of the built-in Spleen face.
const BUILTIN_W: usize = 12;
const BUILTIN_H: usize = 24;

/// A rasterized line of text: grayscale coverage, 0.0 = blank, 1.0 = ink.
pub struct TextRaster {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

/// Font used for label text.
pub enum FontSource {
    Ttf(FontArc),
    Builtin,
}

impl FontSource {
    /// Load the first usable system font, falling back to the built-in
    /// bitmap font with a one-time warning.
    pub fn load_default() -> FontSource {
        for candidate in SYSTEM_FONTS {
            let path = Path::new(candidate);
            if !path.is_file() {
                continue;
            }
            match std::fs::read(path).map(FontArc::try_from_vec) {
                Ok(Ok(font)) => {
                    log::debug!("using font {candidate}");
                    return FontSource::Ttf(font);
                }
                _ => continue,
            }
        }
        FALLBACK_WARNING.call_once(|| {
            log::warn!("no system TrueType font found, using built-in bitmap font");
        });
        FontSource::Builtin
    }

    /// Pixel width of a line at the given pixel height.
    pub fn measure(&self, text: &str, px_height: f32) -> f32 {
        match self {
            FontSource::Ttf(font) => {
                let scaled = font.as_scaled(px_height);
                text.chars()
                    .map(|ch| scaled.h_advance(font.glyph_id(ch)))
                    .sum()
            }
            FontSource::Builtin => {
                let char_w = px_height * BUILTIN_W as f32 / BUILTIN_H as f32;
                text.chars().count() as f32 * char_w
            }
        }
    }

    /// Line height in pixels at the given pixel height.
    pub fn line_height(&self, px_height: f32) -> usize {
        match self {
            FontSource::Ttf(font) => {
                let scaled = font.as_scaled(px_height);
                (scaled.ascent() - scaled.descent()).ceil() as usize
            }
            FontSource::Builtin => px_height.ceil() as usize,
        }
        .max(1)
    }

    /// Rasterize one line of text.
    pub fn render_line(&self, text: &str, px_height: f32) -> TextRaster {
        match self {
            FontSource::Ttf(font) => render_ttf(font, text, px_height),
            FontSource::Builtin => render_builtin(text, px_height),
        }
    }
}

fn render_ttf(font: &FontArc, text: &str, px_height: f32) -> TextRaster {
    let scaled = font.as_scaled(px_height);

    // Layout: compute glyph positions
    let mut glyphs = Vec::new();
    let mut caret_x = 0.0f32;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        glyphs.push((glyph_id, caret_x));
        caret_x += scaled.h_advance(glyph_id);
    }

    let width = (caret_x.ceil() as usize).max(1);
    let ascent = scaled.ascent();
    let height = ((ascent - scaled.descent()).ceil() as usize).max(1);
    let mut data = vec![0.0f32; width * height];

    for &(glyph_id, glyph_x) in &glyphs {
        let glyph = glyph_id.with_scale_and_position(px_height, ab_glyph::point(glyph_x, ascent));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x >= 0 && x < width as i32 && y >= 0 && y < height as i32 {
                    let idx = y as usize * width + x as usize;
                    data[idx] = (data[idx] + coverage).min(1.0);
                }
            });
        }
    }

    TextRaster {
        width,
        height,
        data,
    }
}

fn render_builtin(text: &str, px_height: f32) -> TextRaster {
    let char_h = (px_height.ceil() as usize).max(1);
    let char_w = (char_h * BUILTIN_W / BUILTIN_H).max(1);
    let count = text.chars().count().max(1);
    let width = char_w * count;
    let mut data = vec![0.0f32; width * char_h];

    let Ok(mut spleen) = PSF2Font::new(FONT_12X24) else {
        return TextRaster {
            width,
            height: char_h,
            data,
        };
    };

    for (i, ch) in text.chars().enumerate() {
        let utf8 = ch.to_string();
        let mut glyph = vec![0.0f32; BUILTIN_W * BUILTIN_H];
        if let Some(rows) = spleen.glyph_for_utf8(utf8.as_bytes()) {
            for (y, row) in rows.enumerate() {
                for (x, on) in row.enumerate() {
                    if on && y < BUILTIN_H && x < BUILTIN_W {
                        glyph[y * BUILTIN_W + x] = 1.0;
                    }
                }
            }
        }

        // Nearest-neighbor scale into the target cell.
        let x0 = i * char_w;
        for dy in 0..char_h {
            for dx in 0..char_w {
                let sx = dx * BUILTIN_W / char_w;
                let sy = dy * BUILTIN_H / char_h;
                data[dy * width + x0 + dx] = glyph[sy * BUILTIN_W + sx];
            }
        }
    }

    TextRaster {
        width,
        height: char_h,
        data,
    }
}

/// Word-wrap text to at most `max_lines` lines of `max_width` pixels,
/// truncating the last line with `...` when it does not fit.
pub fn wrap_text(
    text: &str,
    max_width: f32,
    font: &FontSource,
    px_height: f32,
    max_lines: usize,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if font.measure(&candidate, px_height) <= max_width || current.is_empty() {
            current = candidate;
            continue;
        }

        lines.push(std::mem::take(&mut current));
        current = word.to_string();

        if lines.len() >= max_lines {
            // Out of lines: truncate the last one with an ellipsis.
            let mut last = lines.pop().unwrap_or_default();
            while !last.is_empty() && font.measure(&format!("{last}..."), px_height) > max_width {
                last.pop();
            }
            lines.push(if last.is_empty() {
                "...".to_string()
            } else {
                format!("{last}...")
            });
            return lines;
        }
    }

    if !current.is_empty() && lines.len() < max_lines {
        lines.push(current);
    }
    lines
}
