//! # Template Overlay Engine
//!
//! Places composited labels onto pages. Two modes:
//!
//! - **single**: every record gets a fresh copy of the template page with
//!   exactly one label, sealed immediately.
//! - **multiple**: a grid cursor walks the page row-major (across columns
//!   first, then down); the page is sealed when its last cell fills and a
//!   new one is created on demand.
//!
//! The engine exclusively owns the current page; sealed pages are handed
//! to the document assembler in creation order.

mod template;

pub use template::Template;

use image::{RgbaImage, imageops};

use crate::config::{GridSpec, Settings, TemplateType};
use crate::error::LabelError;
use crate::render::{Label, mm_to_px};

/// A label pinned to page coordinates (mm from the page's top-left).
pub struct Placement {
    pub label: Label,
    pub x_mm: f32,
    pub y_mm: f32,
}

/// Content of one sealed output page.
pub enum PageContent {
    /// Fully rasterized page (blank or image-template mode).
    Raster { image: RgbaImage, dpi: u32 },
    /// Labels to merge over a PDF template page.
    Overlay {
        /// Template page to stamp from, cycling through multi-page
        /// templates.
        template_page: usize,
        placements: Vec<Placement>,
    },
}

/// A page no further labels will be placed on.
pub struct SealedPage {
    pub content: PageContent,
}

/// Owns the current page and the grid cursor.
pub struct OverlayEngine<'a> {
    template: &'a Template,
    mode: TemplateType,
    grid: Option<GridSpec>,
    page_w_mm: f32,
    page_h_mm: f32,
    /// Resolution blank pages rasterize at.
    blank_dpi: u32,
    /// Labels already on the current page (multiple mode).
    cursor: usize,
    pages_created: usize,
    current: Option<PageContent>,
    sealed: Vec<SealedPage>,
}

impl<'a> OverlayEngine<'a> {
    pub fn new(template: &'a Template, settings: &Settings) -> OverlayEngine<'a> {
        let (page_w_mm, page_h_mm) = template.page_size_mm();
        OverlayEngine {
            template,
            mode: settings.template_type,
            grid: settings.grid.clone(),
            page_w_mm,
            page_h_mm,
            blank_dpi: settings.dpi,
            cursor: 0,
            pages_created: 0,
            current: None,
            sealed: Vec::new(),
        }
    }

    /// Place one label, sealing and creating pages as the mode requires.
    pub fn place(&mut self, label: Label) -> Result<(), LabelError> {
        match self.mode {
            TemplateType::Single => {
                let mut page = self.fresh_page();
                put(&mut page, label, 0.0, 0.0);
                self.seal_page(page);
            }
            TemplateType::Multiple => {
                let grid = self
                    .grid
                    .clone()
                    .ok_or_else(|| {
                        LabelError::Config("grid parameters missing for multiple mode".into())
                    })?;
                let capacity = grid.capacity();

                let mut page = match self.current.take() {
                    Some(page) => page,
                    None => self.fresh_page(),
                };

                // Row-major fill: across columns first, then down.
                let col = (self.cursor % grid.columns as usize) as u32;
                let row = (self.cursor / grid.columns as usize) as u32;
                let (cx, cy) = grid.cell_origin_mm(row, col, self.page_w_mm, self.page_h_mm);
                put(&mut page, label, cx, cy);
                self.cursor += 1;

                if self.cursor >= capacity {
                    self.seal_page(page);
                } else {
                    self.current = Some(page);
                }
            }
        }
        Ok(())
    }

    /// Seal any partially filled page and return the sealed sequence.
    pub fn finish(mut self) -> Vec<SealedPage> {
        if let Some(page) = self.current.take() {
            self.seal_page(page);
        }
        self.sealed
    }

    /// Start a page from a fresh copy of the immutable template master.
    fn fresh_page(&mut self) -> PageContent {
        let index = self.pages_created;
        self.pages_created += 1;

        match self.template {
            Template::Blank { .. } => {
                let dpi = self.blank_dpi;
                let w = mm_to_px(self.page_w_mm, dpi).max(1);
                let h = mm_to_px(self.page_h_mm, dpi).max(1);
                PageContent::Raster {
                    image: RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255])),
                    dpi,
                }
            }
            Template::Raster { master, dpi, .. } => PageContent::Raster {
                image: master.clone(),
                dpi: *dpi,
            },
            Template::Pdf { page_count, .. } => PageContent::Overlay {
                template_page: index % page_count,
                placements: Vec::new(),
            },
        }
    }

    fn seal_page(&mut self, page: PageContent) {
        self.sealed.push(SealedPage { content: page });
        self.cursor = 0;
    }
}

/// Pin a label at the given cell origin: rasterize in, or record the
/// placement for the PDF merge.
fn put(page: &mut PageContent, label: Label, cell_x_mm: f32, cell_y_mm: f32) {
    let x_mm = cell_x_mm + label.x_mm;
    let y_mm = cell_y_mm + label.y_mm;

    match page {
        PageContent::Raster { image, dpi } => {
            // Labels for raster pages are composed at the page's own DPI,
            // so this is a direct alpha-aware blit.
            let x = mm_to_px(x_mm, *dpi) as i64;
            let y = mm_to_px(y_mm, *dpi) as i64;
            imageops::overlay(image, &label.image, x, y);
        }
        PageContent::Overlay { placements, .. } => {
            placements.push(Placement { label, x_mm, y_mm });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CodePosition, CodeSpec, GridSpec, LogoSpec, TextSpec};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn label_at(x_mm: f32, y_mm: f32) -> Label {
        Label {
            image: RgbaImage::from_pixel(10, 10, image::Rgba([0, 0, 0, 255])),
            x_mm,
            y_mm,
            width_mm: 15.0,
            height_mm: 15.0,
        }
    }

    fn settings(mode: TemplateType, grid: Option<GridSpec>) -> Settings {
        Settings {
            csv_file: PathBuf::from("data.csv"),
            output: PathBuf::from("out.pdf"),
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 2.0,
            dpi: 300,
            delimiter: b'\t',
            template: None,
            template_type: mode,
            code: CodeSpec {
                x_mm: Some(5.0),
                y_mm: Some(3.0),
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
            grid,
            logo: LogoSpec {
                path: PathBuf::from("eac.png"),
                height_mm: 5.0,
                enabled: false,
            },
            no_pdf: false,
            transparent_bg: false,
        }
    }

    fn test_grid() -> GridSpec {
        GridSpec {
            columns: 3,
            rows: 6,
            cell_width_mm: Some(50.0),
            cell_height_mm: Some(30.0),
            margin_left_mm: 10.0,
            margin_top_mm: 15.0,
            spacing_h_mm: 5.0,
            spacing_v_mm: 3.0,
        }
    }

    #[test]
    fn test_single_mode_one_page_per_label() {
        let template = Template::Blank {
            page_w_mm: 30.0,
            page_h_mm: 20.0,
        };
        let settings = settings(TemplateType::Single, None);
        let mut engine = OverlayEngine::new(&template, &settings);

        for _ in 0..3 {
            engine.place(label_at(10.0, 5.0)).unwrap();
        }
        let pages = engine.finish();
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn test_grid_fill_order_row_major() {
        // Use a PDF-style overlay page so placements stay inspectable.
        let template = Template::Pdf {
            doc: lopdf::Document::with_version("1.5"),
            page_count: 1,
            page_w_mm: 210.0,
            page_h_mm: 297.0,
        };
        let settings = settings(TemplateType::Multiple, Some(test_grid()));
        let mut engine = OverlayEngine::new(&template, &settings);

        for _ in 0..4 {
            engine.place(label_at(5.0, 3.0)).unwrap();
        }
        let pages = engine.finish();
        assert_eq!(pages.len(), 1);

        let PageContent::Overlay { placements, .. } = &pages[0].content else {
            panic!("expected overlay page");
        };
        // index 0 -> (row 0, col 0): cell origin (10, 15) + label (5, 3)
        assert_eq!((placements[0].x_mm, placements[0].y_mm), (15.0, 18.0));
        // index 1 -> (row 0, col 1): x = 10 + 55 + 5
        assert_eq!((placements[1].x_mm, placements[1].y_mm), (70.0, 18.0));
        // index 3 -> (row 1, col 0): y = 15 + 33 + 3
        assert_eq!((placements[3].x_mm, placements[3].y_mm), (15.0, 51.0));
    }

    #[test]
    fn test_grid_page_break_on_capacity() {
        let mut grid = test_grid();
        grid.columns = 2;
        grid.rows = 2;
        let template = Template::Pdf {
            doc: lopdf::Document::with_version("1.5"),
            page_count: 1,
            page_w_mm: 210.0,
            page_h_mm: 297.0,
        };
        let settings = settings(TemplateType::Multiple, Some(grid));
        let mut engine = OverlayEngine::new(&template, &settings);

        // 5 labels on a 2x2 grid: two pages, second holds one label.
        for _ in 0..5 {
            engine.place(label_at(5.0, 3.0)).unwrap();
        }
        let pages = engine.finish();
        assert_eq!(pages.len(), 2);

        let PageContent::Overlay { placements, .. } = &pages[1].content else {
            panic!("expected overlay page");
        };
        assert_eq!(placements.len(), 1);
        // The new page restarts at (row 0, col 0).
        assert_eq!((placements[0].x_mm, placements[0].y_mm), (15.0, 18.0));
    }

    #[test]
    fn test_multi_page_template_cycles() {
        let template = Template::Pdf {
            doc: lopdf::Document::with_version("1.5"),
            page_count: 2,
            page_w_mm: 210.0,
            page_h_mm: 297.0,
        };
        let settings = settings(TemplateType::Single, None);
        let mut engine = OverlayEngine::new(&template, &settings);

        for _ in 0..3 {
            engine.place(label_at(0.0, 0.0)).unwrap();
        }
        let pages = engine.finish();
        let template_pages: Vec<usize> = pages
            .iter()
            .map(|p| match &p.content {
                PageContent::Overlay { template_page, .. } => *template_page,
                _ => panic!("expected overlay"),
            })
            .collect();
        assert_eq!(template_pages, vec![0, 1, 0]);
    }

    #[test]
    fn test_raster_page_receives_ink() {
        let template = Template::Raster {
            master: RgbaImage::from_pixel(300, 200, image::Rgba([255, 255, 255, 255])),
            dpi: 300,
            page_w_mm: 25.4,
            page_h_mm: 16.9,
        };
        let settings = settings(TemplateType::Single, None);
        let mut engine = OverlayEngine::new(&template, &settings);
        engine.place(label_at(5.0, 5.0)).unwrap();
        let pages = engine.finish();

        let PageContent::Raster { image, .. } = &pages[0].content else {
            panic!("expected raster page");
        };
        // 5mm at 300 DPI = 59px; the 10x10 black label sits there.
        assert_eq!(image.get_pixel(60, 60).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }
}
