//! # Configuration
//!
//! Settings are resolved once per run from three immutable layers folded
//! left to right: built-in defaults, an optional JSON/INI config file, and
//! command-line flags. Later layers win. The result is a read-only
//! [`Settings`] value shared by every pipeline stage.

mod file;
mod merge;
pub mod presets;

pub use file::FileConfig;
pub use merge::{CliOverrides, resolve};

use std::path::PathBuf;

/// Millimeters per inch, used for every mm/pixel conversion.
pub const MM_PER_INCH: f32 = 25.4;

/// Points per millimeter (PDF user space).
pub const PT_PER_MM: f32 = 2.834_65;

/// How labels map onto template pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateType {
    /// One full-page template per label.
    Single,
    /// A grid of labels per page.
    Multiple,
}

impl TemplateType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(TemplateType::Single),
            "multiple" => Some(TemplateType::Multiple),
            _ => None,
        }
    }
}

/// Corner anchor for the code when explicit coordinates are not given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodePosition {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

impl CodePosition {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bottom-right" => Some(CodePosition::BottomRight),
            "bottom-left" => Some(CodePosition::BottomLeft),
            "top-right" => Some(CodePosition::TopRight),
            "top-left" => Some(CodePosition::TopLeft),
            _ => None,
        }
    }
}

/// Placement and sizing of the 2D code within a label cell.
#[derive(Debug, Clone)]
pub struct CodeSpec {
    /// Explicit top-left position in mm, if configured. Overrides `position`.
    pub x_mm: Option<f32>,
    pub y_mm: Option<f32>,
    /// Corner anchor used when `x_mm`/`y_mm` are unset.
    pub position: CodePosition,
    /// Size of the larger side in mm.
    pub size_mm: f32,
    /// Margin from the anchored edges in mm.
    pub margin_mm: f32,
    /// Extra scale factor applied on top of `size_mm`.
    pub scale: f32,
    /// CSV column holding the payload (0-based).
    pub column: usize,
}

/// Text fragment extraction and rendering parameters.
#[derive(Debug, Clone)]
pub struct TextSpec {
    /// CSV column the fragment is sliced from. `None` derives a short code
    /// from the payload when text below the code is requested.
    pub column: Option<usize>,
    /// Character offset into the column value.
    pub start: usize,
    /// Fragment length in characters; `None` takes the rest of the field.
    pub length: Option<usize>,
    /// Font size in points.
    pub font_size: f32,
    pub offset_x_mm: f32,
    pub offset_y_mm: f32,
    /// RGB text color.
    pub color: [u8; 3],
    /// Render the fragment under the code instead of beside it.
    pub below_code: bool,
    /// Suppress the product-name line.
    pub no_product_name: bool,
}

/// Grid geometry for `TemplateType::Multiple`.
#[derive(Debug, Clone)]
pub struct GridSpec {
    /// Labels per row (fill order goes across columns first).
    pub columns: u32,
    /// Rows per page.
    pub rows: u32,
    /// Cell size in mm; `None` divides the page evenly.
    pub cell_width_mm: Option<f32>,
    pub cell_height_mm: Option<f32>,
    pub margin_left_mm: f32,
    pub margin_top_mm: f32,
    pub spacing_h_mm: f32,
    pub spacing_v_mm: f32,
}

impl GridSpec {
    /// Labels that fit on one page.
    pub fn capacity(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Cell size in mm for a page of the given dimensions.
    pub fn cell_mm(&self, page_w_mm: f32, page_h_mm: f32) -> (f32, f32) {
        (
            self.cell_width_mm
                .unwrap_or(page_w_mm / self.columns as f32),
            self.cell_height_mm.unwrap_or(page_h_mm / self.rows as f32),
        )
    }

    /// Top-left origin of the cell at (row, col) in mm from the page's
    /// top-left corner.
    pub fn cell_origin_mm(
        &self,
        row: u32,
        col: u32,
        page_w_mm: f32,
        page_h_mm: f32,
    ) -> (f32, f32) {
        let (cw, ch) = self.cell_mm(page_w_mm, page_h_mm);
        (
            self.margin_left_mm + col as f32 * (cw + self.spacing_h_mm),
            self.margin_top_mm + row as f32 * (ch + self.spacing_v_mm),
        )
    }
}

/// Logo image parameters.
#[derive(Debug, Clone)]
pub struct LogoSpec {
    pub path: PathBuf,
    /// Maximum height in mm; width follows the aspect ratio.
    pub height_mm: f32,
    pub enabled: bool,
}

/// Fully resolved, immutable run settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub csv_file: PathBuf,
    pub output: PathBuf,
    /// Page geometry used when no template provides one.
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    pub dpi: u32,
    pub delimiter: u8,
    pub template: Option<PathBuf>,
    pub template_type: TemplateType,
    pub code: CodeSpec,
    pub text: TextSpec,
    /// Present iff `template_type == Multiple`.
    pub grid: Option<GridSpec>,
    pub logo: LogoSpec,
    pub no_pdf: bool,
    pub transparent_bg: bool,
}

/// Parse a delimiter argument. Accepts a literal character, the escape
/// sequence `\t`, or the word `tab`.
pub fn parse_delimiter(s: &str) -> Option<u8> {
    match s {
        "\\t" | "tab" | "\t" => Some(b'\t'),
        s if s.len() == 1 && s.is_ascii() => Some(s.as_bytes()[0]),
        _ => None,
    }
}

/// Parse a text color: a named color or `#rrggbb`.
pub fn parse_color(s: &str) -> Option<[u8; 3]> {
    match s {
        "black" => Some([0, 0, 0]),
        "white" => Some([255, 255, 255]),
        "red" => Some([255, 0, 0]),
        "green" => Some([0, 128, 0]),
        "blue" => Some([0, 0, 255]),
        "gray" | "grey" => Some([128, 128, 128]),
        s => {
            let hex = s.strip_prefix('#')?;
            if hex.len() != 6 {
                return None;
            }
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some([r, g, b])
        }
    }
}
