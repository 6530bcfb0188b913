//! Single-page document composition.
//!
//! The page is filled edge to edge by the rasterized scene. Clickable regions
//! recorded on the canvas become invisible `/Link` annotations with URI actions.

use crate::pipeline::error::Result;
use crate::pipeline::scene::ClickRegion;
use common::model::batch::OutputMode;
use common::model::record::GenerationId;
use common::model::template::Frame;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Cursor;

/// Page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    pub const A4_LANDSCAPE: PageSize = PageSize {
        width_pt: 841.89,
        height_pt: 595.28,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4_LANDSCAPE
    }
}

/// A link rectangle in page space: `[llx, lly, urx, ury]`, origin bottom-left.
pub type PageRect = [f32; 4];

#[derive(Debug, Clone)]
pub struct DocumentComposer {
    page: PageSize,
    title: String,
}

impl DocumentComposer {
    pub fn new(page: PageSize, title: impl Into<String>) -> Self {
        Self {
            page,
            title: title.into(),
        }
    }

    /// Maps a canvas rectangle onto the page.
    ///
    /// Both axes scale by `page / canvas`; y is flipped because the canvas
    /// grows downwards and PDF user space grows upwards.
    pub fn page_rect(&self, rect: &Frame, canvas_width: f32, canvas_height: f32) -> PageRect {
        let sx = self.page.width_pt / canvas_width;
        let sy = self.page.height_pt / canvas_height;
        [
            rect.x * sx,
            self.page.height_pt - (rect.y + rect.height) * sy,
            (rect.x + rect.width) * sx,
            self.page.height_pt - rect.y * sy,
        ]
    }

    /// Encodes one row's output in the requested mode.
    pub fn render(
        &self,
        mode: OutputMode,
        bitmap: &RgbaImage,
        canvas: (f32, f32),
        regions: &[ClickRegion],
        id: &GenerationId,
    ) -> Result<Vec<u8>> {
        match mode {
            OutputMode::Pdf => self.compose(bitmap, canvas, regions, id),
            OutputMode::Png => encode_png(bitmap),
        }
    }

    /// Builds a one-page PDF with `bitmap` as the full-page background.
    pub fn compose(
        &self,
        bitmap: &RgbaImage,
        canvas: (f32, f32),
        regions: &[ClickRegion],
        id: &GenerationId,
    ) -> Result<Vec<u8>> {
        let (canvas_width, canvas_height) = canvas;
        let (page_w, page_h) = (self.page.width_pt, self.page.height_pt);

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let rgb = flatten_on_white(bitmap);
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => rgb.width() as i64,
                "Height" => rgb.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.into_raw(),
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        page_w.into(),
                        0.into(),
                        0.into(),
                        page_h.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut annots = Vec::with_capacity(regions.len());
        for region in regions {
            let rect = self.page_rect(&region.rect, canvas_width, canvas_height);
            let annot = dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => rect.iter().map(|v| Object::from(*v)).collect::<Vec<Object>>(),
                "Border" => vec![0.into(), 0.into(), 0.into()],
                "A" => dictionary! {
                    "S" => "URI",
                    "URI" => Object::string_literal(region.target.as_str()),
                },
            };
            annots.push(Object::Reference(doc.add_object(annot)));
        }

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page_w.into(), page_h.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        };
        if !annots.is_empty() {
            page.set("Annots", Object::Array(annots));
        }
        let page_id = doc.add_object(page);

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(self.title.as_str()),
            "Subject" => Object::string_literal(id.as_str()),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);
        doc.compress();

        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }
}

/// Drops alpha by compositing over white, the way the page would show it.
fn flatten_on_white(bitmap: &RgbaImage) -> image::RgbImage {
    let mut background =
        RgbaImage::from_pixel(bitmap.width(), bitmap.height(), image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut background, bitmap, 0, 0);
    DynamicImage::ImageRgba8(background).to_rgb8()
}

pub fn encode_png(bitmap: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    bitmap.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

/// PNG preview scaled to `width` pixels, aspect ratio kept.
pub fn thumbnail_png(bitmap: &RgbaImage, width: u32) -> Result<Vec<u8>> {
    let width = width.clamp(1, bitmap.width().max(1));
    let height = ((bitmap.height() as f64 * width as f64 / bitmap.width().max(1) as f64).round()
        as u32)
        .max(1);
    let small = image::imageops::resize(bitmap, width, height, FilterType::Triangle);
    encode_png(&small)
}
