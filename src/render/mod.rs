//! # Label Rendering
//!
//! Rasterization of one label: code bitmap, optional text fragment, and
//! optional logo composited onto a shared RGBA canvas. All geometry is
//! specified in millimeters and converted with `px = mm * dpi / 25.4`.

pub mod font;
pub mod label;

pub use label::{Label, LabelComposer};

use crate::config::MM_PER_INCH;

/// Labels destined for PDF embedding are rasterized at this resolution
/// regardless of the page DPI, so text stays legible after PDF scaling.
/// Placement then scales by physical size only.
pub const PDF_COMPOSE_DPI: u32 = 1200;

/// Convert millimeters to pixels at the given resolution.
pub fn mm_to_px(mm: f32, dpi: u32) -> u32 {
    (mm * dpi as f32 / MM_PER_INCH).round().max(0.0) as u32
}
