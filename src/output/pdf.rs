//! PDF writing.
//!
//! Raster pages (blank or image templates) become full-page images in a
//! new PDF. PDF-template pages are merged instead: each output page
//! reuses the template page's content streams and gains an overlay
//! content stream that stamps the label images, so the vector template
//! survives untouched.

use std::io::Write as _;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use printpdf::{ColorBits, ColorSpace, ImageTransform, ImageXObject, Mm, PdfDocument, Px};

use crate::config::{MM_PER_INCH, PT_PER_MM, Settings};
use crate::error::LabelError;
use crate::layout::{PageContent, Placement, SealedPage, Template};

use super::atomic_write;

/// Write the sealed pages as a multi-page PDF at `settings.output`.
pub fn write_pdf(
    pages: &[SealedPage],
    template: &Template,
    settings: &Settings,
) -> Result<(), LabelError> {
    if pages.is_empty() {
        return Err(LabelError::OutputWrite(
            "no pages to write; every input row was skipped".into(),
        ));
    }

    match template {
        Template::Pdf { doc, .. } => write_overlay_pdf(pages, doc, template, settings),
        _ => write_raster_pdf(pages, template, settings),
    }
}

/// Assemble a PDF from fully rasterized pages.
fn write_raster_pdf(
    pages: &[SealedPage],
    template: &Template,
    settings: &Settings,
) -> Result<(), LabelError> {
    let (page_w_mm, page_h_mm) = template.page_size_mm();
    let (doc, first_page, first_layer) =
        PdfDocument::new("labels", Mm(page_w_mm), Mm(page_h_mm), "Layer 1");

    for (i, page) in pages.iter().enumerate() {
        let PageContent::Raster { image, .. } = &page.content else {
            return Err(LabelError::OutputWrite(
                "mixed page content in raster output".into(),
            ));
        };

        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (p, l) = doc.add_page(Mm(page_w_mm), Mm(page_h_mm), "Layer 1");
            doc.get_page(p).get_layer(l)
        };

        // Pages start from an opaque master, so alpha can be dropped.
        let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        let (w, h) = (rgb.width(), rgb.height());
        let pdf_image = printpdf::Image::from(ImageXObject {
            width: Px(w as usize),
            height: Px(h as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: false,
            image_data: rgb.into_raw(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });

        // Pick the DPI that makes the bitmap span the page exactly.
        let dpi = w as f32 / (page_w_mm / MM_PER_INCH);
        pdf_image.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(0.0)),
                translate_y: Some(Mm(0.0)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }

    atomic_write(&settings.output, |file| {
        let mut writer = std::io::BufWriter::new(file);
        doc.save(&mut writer)
            .map_err(|e| LabelError::OutputWrite(format!("{}: {e}", settings.output.display())))
    })
}

/// Merge label overlays onto copies of the template's pages.
fn write_overlay_pdf(
    pages: &[SealedPage],
    template_doc: &lopdf::Document,
    template: &Template,
    settings: &Settings,
) -> Result<(), LabelError> {
    let (_, page_h_mm) = template.page_size_mm();
    let mut doc = template_doc.clone();

    let template_pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if template_pages.is_empty() {
        return Err(LabelError::OutputWrite("template has no pages".into()));
    }

    // Protects the template's graphics state from the overlay ops.
    let save_state_id = doc.add_object(Stream::new(
        Dictionary::new(),
        b"q\n".to_vec(),
    ));

    let mut out_page_ids = Vec::with_capacity(pages.len());
    for page in pages {
        let PageContent::Overlay {
            template_page,
            placements,
        } = &page.content
        else {
            return Err(LabelError::OutputWrite(
                "mixed page content in overlay output".into(),
            ));
        };

        let source_id = template_pages[template_page % template_pages.len()];
        let page_id = stamp_page(
            &mut doc,
            source_id,
            save_state_id,
            placements,
            page_h_mm,
        )?;
        out_page_ids.push(page_id);
    }

    rebuild_page_tree(&mut doc, &template_pages, &out_page_ids)?;

    atomic_write(&settings.output, |file| {
        let mut writer = std::io::BufWriter::new(file);
        doc.save_to(&mut writer)
            .map_err(|e| LabelError::OutputWrite(format!("{}: {e}", settings.output.display())))
    })
}

/// Clone one template page, append an overlay content stream with the
/// label images, and return the new page's id.
fn stamp_page(
    doc: &mut lopdf::Document,
    source_id: ObjectId,
    save_state_id: ObjectId,
    placements: &[Placement],
    page_h_mm: f32,
) -> Result<ObjectId, LabelError> {
    let source = doc
        .get_object(source_id)
        .and_then(|o| o.as_dict())
        .map_err(|e| LabelError::OutputWrite(format!("template page: {e}")))?
        .clone();

    // Template content streams stay shared between output pages.
    let mut contents: Vec<Object> = match source.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(other) => vec![other.clone()],
        Err(_) => Vec::new(),
    };
    contents.insert(0, Object::Reference(save_state_id));

    let mut resources = inherited_dict(doc, source_id, b"Resources").unwrap_or_default();
    let mut xobjects = match resources.get(b"XObject") {
        Ok(obj) => resolve_dict(doc, obj).unwrap_or_default(),
        Err(_) => Dictionary::new(),
    };

    let mut ops = vec![Operation::new("Q", vec![])];
    for (i, placement) in placements.iter().enumerate() {
        let image_id = add_image_xobject(doc, &placement.label.image);
        let name = format!("Lg{i}");
        xobjects.set(name.as_bytes(), Object::Reference(image_id));

        let w_pt = placement.label.width_mm * PT_PER_MM;
        let h_pt = placement.label.height_mm * PT_PER_MM;
        let x_pt = placement.x_mm * PT_PER_MM;
        // Page origin is bottom-left; placements are measured from the top.
        let y_pt = (page_h_mm - placement.y_mm - placement.label.height_mm) * PT_PER_MM;

        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![
                Object::Real(w_pt),
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(h_pt),
                Object::Real(x_pt),
                Object::Real(y_pt),
            ],
        ));
        ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        ops.push(Operation::new("Q", vec![]));
    }

    let overlay = Content { operations: ops };
    let encoded = overlay
        .encode()
        .map_err(|e| LabelError::OutputWrite(format!("overlay content: {e}")))?;
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
    contents.push(Object::Reference(overlay_id));

    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page = source;
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    if let Some(media_box) = inherited_value(doc, source_id, b"MediaBox") {
        page.set("MediaBox", media_box);
    }
    Ok(doc.add_object(page))
}

/// Deflate-compressed image XObject with an SMask carrying the alpha
/// channel, so transparent label regions let the template show through.
fn add_image_xobject(doc: &mut lopdf::Document, image: &RgbaImage) -> ObjectId {
    let (w, h) = (image.width(), image.height());
    let mut rgb = Vec::with_capacity((w * h * 3) as usize);
    let mut alpha = Vec::with_capacity((w * h) as usize);
    for px in image.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
    }

    let mut smask_dict = Dictionary::new();
    smask_dict.set("Type", Object::Name(b"XObject".to_vec()));
    smask_dict.set("Subtype", Object::Name(b"Image".to_vec()));
    smask_dict.set("Width", Object::Integer(w as i64));
    smask_dict.set("Height", Object::Integer(h as i64));
    smask_dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
    smask_dict.set("BitsPerComponent", Object::Integer(8));
    smask_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    let smask_id = doc.add_object(Stream::new(smask_dict, flate_compress(&alpha)));

    let mut image_dict = Dictionary::new();
    image_dict.set("Type", Object::Name(b"XObject".to_vec()));
    image_dict.set("Subtype", Object::Name(b"Image".to_vec()));
    image_dict.set("Width", Object::Integer(w as i64));
    image_dict.set("Height", Object::Integer(h as i64));
    image_dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    image_dict.set("BitsPerComponent", Object::Integer(8));
    image_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    image_dict.set("SMask", Object::Reference(smask_id));
    doc.add_object(Stream::new(image_dict, flate_compress(&rgb)))
}

/// Point the document's page tree at the stamped pages, replacing the
/// template originals.
fn rebuild_page_tree(
    doc: &mut lopdf::Document,
    template_pages: &[ObjectId],
    out_page_ids: &[ObjectId],
) -> Result<(), LabelError> {
    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set(
        "Kids",
        Object::Array(out_page_ids.iter().map(|id| Object::Reference(*id)).collect()),
    );
    pages_dict.set("Count", Object::Integer(out_page_ids.len() as i64));
    let pages_id = doc.add_object(pages_dict);

    for page_id in out_page_ids {
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(*page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let root_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|e| LabelError::OutputWrite(format!("template catalog: {e}")))?;
    match doc.get_object_mut(root_id) {
        Ok(Object::Dictionary(catalog)) => {
            catalog.set("Pages", Object::Reference(pages_id));
        }
        _ => {
            return Err(LabelError::OutputWrite(
                "template catalog is not a dictionary".into(),
            ));
        }
    }

    // The original page dicts are no longer reachable; drop them. Their
    // content and resource objects stay, shared by the stamped pages.
    for id in template_pages {
        doc.objects.remove(id);
    }
    Ok(())
}

/// Look up `key` on a page, walking the Parent chain for inherited
/// attributes, and return a resolved dictionary clone.
fn inherited_dict(doc: &lopdf::Document, page: ObjectId, key: &[u8]) -> Option<Dictionary> {
    inherited_value(doc, page, key).and_then(|obj| resolve_dict(doc, &obj))
}

fn inherited_value(doc: &lopdf::Document, page: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = page;
    for _ in 0..32 {
        let dict = doc.get_object(node).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(id)) => node = *id,
            _ => return None,
        }
    }
    None
}

fn resolve_dict(doc: &lopdf::Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Dictionary(d) => Some(d.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn flate_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}
