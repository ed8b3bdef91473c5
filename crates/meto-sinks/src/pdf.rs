use anyhow::{anyhow, bail, Result};
use meto_core::{DocumentPayload, DocumentSink, RasterImage};
use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm,
    PdfDocument, PdfLayerReference, Px,
};
use tracing::debug;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;

const TITLE_SIZE: f32 = 22.0;
const BODY_SIZE: f32 = 11.0;
const LINE_HEIGHT_MM: f32 = 6.5;

/// Embedded images are scaled to this width in points
const IMAGE_WIDTH_PT: f32 = 500.0;

const MM_PER_PT: f32 = 25.4 / 72.0;

/// Renders a single A4 page: title, metadata lines, optional image below
#[derive(Debug, Clone, Default)]
pub struct PdfSink;

impl PdfSink {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentSink for PdfSink {
    fn write_document(&self, document: &DocumentPayload) -> Result<Vec<u8>> {
        let (doc, page, layer) = PdfDocument::new(
            document.title.as_str(),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let layer = doc.get_page(page).get_layer(layer);

        let title_font = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| anyhow!("Failed to load title font: {}", e))?;
        let body_font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow!("Failed to load body font: {}", e))?;

        let mut y = PAGE_HEIGHT_MM - MARGIN_MM - 10.0;
        layer.use_text(document.title.as_str(), TITLE_SIZE, Mm(MARGIN_MM), Mm(y), &title_font);
        y -= 14.0;

        for line in &document.lines {
            layer.use_text(line.as_str(), BODY_SIZE, Mm(MARGIN_MM), Mm(y), &body_font);
            y -= LINE_HEIGHT_MM;
        }

        if let Some(image) = &document.image {
            place_image(&layer, image, y - 6.0)?;
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| anyhow!("Failed to serialize PDF: {}", e))?;
        debug!(bytes = bytes.len(), image = document.image.is_some(), "Wrote pdf");
        Ok(bytes)
    }
}

/// Place `image` horizontally centered with its top edge at `top` mm
fn place_image(layer: &PdfLayerReference, image: &RasterImage, top: f32) -> Result<()> {
    let expected = image.width as usize * image.height as usize * 3;
    if image.width == 0 || image.height == 0 || image.rgb.len() != expected {
        bail!(
            "Raster is {}x{} but carries {} bytes",
            image.width,
            image.height,
            image.rgb.len()
        );
    }

    let width_mm = IMAGE_WIDTH_PT * MM_PER_PT;
    let height_mm = width_mm * image.height as f32 / image.width as f32;
    let dpi = image.width as f32 * 72.0 / IMAGE_WIDTH_PT;

    let xobject = ImageXObject {
        width: Px(image.width as usize),
        height: Px(image.height as usize),
        color_space: ColorSpace::Rgb,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: image.rgb.clone(),
        image_filter: None,
        smask: None,
        clipping_bbox: None,
    };

    Image::from(xobject).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm((PAGE_WIDTH_MM - width_mm) / 2.0)),
            translate_y: Some(Mm(top - height_mm)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(image: Option<RasterImage>) -> DocumentPayload {
        DocumentPayload {
            title: "Weather Report".to_string(),
            lines: vec![
                "Location: All locations".to_string(),
                "Date range: 2024-05-01 00:00 UTC to 2024-05-03 00:00 UTC".to_string(),
            ],
            image,
        }
    }

    #[test]
    fn writes_text_only_document() {
        let bytes = PdfSink::new().write_document(&payload(None)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn writes_document_with_image() {
        let image = RasterImage {
            width: 30,
            height: 10,
            rgb: vec![200; 30 * 10 * 3],
        };
        let with_image = PdfSink::new().write_document(&payload(Some(image))).unwrap();
        let without = PdfSink::new().write_document(&payload(None)).unwrap();

        assert!(with_image.starts_with(b"%PDF"));
        assert!(with_image.len() > without.len());
    }

    #[test]
    fn rejects_truncated_raster() {
        let image = RasterImage {
            width: 30,
            height: 10,
            rgb: vec![0; 10],
        };
        assert!(PdfSink::new().write_document(&payload(Some(image))).is_err());
    }
}
