//! Template loading.
//!
//! A template is the background a label lands on: a PDF document, a raster
//! image, or a blank page when no template is configured. Templates are
//! loaded once, kept immutable, and never drawn on; every output page
//! starts from a fresh copy so content from one record can never bleed
//! through the transparent regions of the next.

use image::RgbaImage;
use std::path::Path;

use crate::config::{MM_PER_INCH, PT_PER_MM, Settings};
use crate::error::LabelError;
use crate::render::PDF_COMPOSE_DPI;

/// Immutable master the overlay engine stamps pages from.
#[derive(Debug)]
pub enum Template {
    /// No template: blank white pages of the configured geometry.
    Blank { page_w_mm: f32, page_h_mm: f32 },
    /// A raster image template; labels are composited onto clones of it.
    Raster {
        master: RgbaImage,
        /// Effective resolution, derived from the configured DPI.
        dpi: u32,
        page_w_mm: f32,
        page_h_mm: f32,
    },
    /// A PDF template; labels are merged in as page overlays.
    Pdf {
        doc: lopdf::Document,
        page_count: usize,
        page_w_mm: f32,
        page_h_mm: f32,
    },
}

impl Template {
    /// Load the configured template. Any load failure is fatal: a
    /// template is required infrastructure, not a per-record resource.
    pub fn load(settings: &Settings) -> Result<Template, LabelError> {
        let Some(path) = &settings.template else {
            return Ok(Template::Blank {
                page_w_mm: settings.page_width_mm,
                page_h_mm: settings.page_height_mm,
            });
        };

        let is_pdf = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            Self::load_pdf(path)
        } else {
            Self::load_raster(path, settings.dpi)
        }
    }

    fn load_pdf(path: &Path) -> Result<Template, LabelError> {
        let doc = lopdf::Document::load(path)
            .map_err(|e| LabelError::TemplateLoad(format!("{}: {e}", path.display())))?;

        let pages = doc.get_pages();
        let page_count = pages.len();
        let Some((_, &first_page)) = pages.iter().next() else {
            return Err(LabelError::TemplateLoad(format!(
                "{}: template has no pages",
                path.display()
            )));
        };

        let (w_pt, h_pt) = media_box(&doc, first_page).ok_or_else(|| {
            LabelError::TemplateLoad(format!("{}: no MediaBox on first page", path.display()))
        })?;

        Ok(Template::Pdf {
            doc,
            page_count,
            page_w_mm: w_pt / PT_PER_MM,
            page_h_mm: h_pt / PT_PER_MM,
        })
    }

    fn load_raster(path: &Path, dpi: u32) -> Result<Template, LabelError> {
        let master = image::open(path)
            .map_err(|e| LabelError::TemplateLoad(format!("{}: {e}", path.display())))?
            .to_rgba8();

        let page_w_mm = master.width() as f32 * MM_PER_INCH / dpi as f32;
        let page_h_mm = master.height() as f32 * MM_PER_INCH / dpi as f32;

        Ok(Template::Raster {
            master,
            dpi,
            page_w_mm,
            page_h_mm,
        })
    }

    /// Page size in mm.
    pub fn page_size_mm(&self) -> (f32, f32) {
        match self {
            Template::Blank {
                page_w_mm,
                page_h_mm,
            }
            | Template::Raster {
                page_w_mm,
                page_h_mm,
                ..
            }
            | Template::Pdf {
                page_w_mm,
                page_h_mm,
                ..
            } => (*page_w_mm, *page_h_mm),
        }
    }

    /// Resolution labels should be composed at for this template kind.
    ///
    /// PDF overlays are placed by physical size, so labels render at the
    /// fixed high resolution; raster pages composite at their own density.
    pub fn compose_dpi(&self, settings: &Settings) -> u32 {
        match self {
            Template::Pdf { .. } => PDF_COMPOSE_DPI,
            Template::Raster { dpi, .. } => *dpi,
            Template::Blank { .. } => settings.dpi,
        }
    }
}

/// Width and height in points from a page's MediaBox, following the
/// Parent chain for inherited boxes.
fn media_box(doc: &lopdf::Document, page: lopdf::ObjectId) -> Option<(f32, f32)> {
    let mut node = page;
    for _ in 0..32 {
        let dict = doc.get_object(node).ok()?.as_dict().ok()?;
        if let Ok(boxed) = dict.get(b"MediaBox") {
            let arr = resolve(doc, boxed)?.as_array().ok()?;
            if arr.len() != 4 {
                return None;
            }
            let nums: Vec<f32> = arr.iter().filter_map(number).collect();
            if nums.len() != 4 {
                return None;
            }
            return Some(((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs()));
        }
        match dict.get(b"Parent") {
            Ok(lopdf::Object::Reference(id)) => node = *id,
            _ => return None,
        }
    }
    None
}

fn resolve<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> Option<&'a lopdf::Object> {
    match obj {
        lopdf::Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(obj: &lopdf::Object) -> Option<f32> {
    match obj {
        lopdf::Object::Integer(i) => Some(*i as f32),
        lopdf::Object::Real(r) => Some(*r),
        _ => None,
    }
}
