//! Scene rasterization.
//!
//! [`Rasterizer`] is the capability boundary the batch scheduler renders through.
//! [`SkiaRasterizer`] is the built-in implementation: a tiny-skia surface reused
//! across rows, glyph outlines from ttf-parser, embedded images decoded with `image`.
//! Text is drawn with the configured font, or with the bundled DejaVu Sans face
//! when none is configured.

use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::scene::SceneGraph;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use common::model::template::{
    Frame, Node, ShapeKind, StaticContent, TextAlign, TextStyle,
};
use image::{GrayImage, RgbaImage};
use log::debug;
use std::sync::Arc;
use tiny_skia::{
    Color, FillRule, FilterQuality, IntSize, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Rect,
    Stroke, StrokeDash, Transform,
};
use ttf_parser::OutlineBuilder;

/// Resolution of template canvas units.
pub const BASE_DPI: f32 = 72.0;
/// Target resolution for printable output.
pub const PRINT_DPI: f32 = 300.0;

/// Largest bitmap a scene may render to. A4 at 300 dpi is about 8.7 million pixels.
pub const MAX_OUTPUT_PIXELS: u64 = 64_000_000;

/// DejaVu Sans, used for text when no font file is configured.
pub static FALLBACK_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Scale factor that takes a canvas authored at [`BASE_DPI`] to `dpi`.
pub fn multiplier_for_dpi(dpi: f32) -> f32 {
    dpi / BASE_DPI
}

/// Pixel size of a `width`×`height` canvas rendered at `multiplier`.
pub fn output_size(width: f32, height: f32, multiplier: f32) -> (u32, u32) {
    let w = (width * multiplier).round().max(1.0) as u32;
    let h = (height * multiplier).round().max(1.0) as u32;
    (w, h)
}

/// Renders a resolved scene into a bitmap of `output_size(scene, multiplier)` pixels.
///
/// Implementations must not draw editor-only nodes and must return the full
/// bitmap or an error; there is no partial output.
pub trait Rasterizer {
    fn rasterize(&mut self, scene: &SceneGraph, multiplier: f32) -> Result<RgbaImage>;
}

/// CPU rasterizer over a single reusable tiny-skia surface.
pub struct SkiaRasterizer {
    surface: Option<Pixmap>,
    font: Option<Arc<Vec<u8>>>,
}

impl SkiaRasterizer {
    /// `font` is a TrueType/OpenType file used for every text node. Without it,
    /// [`FALLBACK_FONT`] is used.
    pub fn new(font: Option<Arc<Vec<u8>>>) -> Self {
        Self {
            surface: None,
            font,
        }
    }

    fn surface(&mut self, width: u32, height: u32) -> Result<&mut Pixmap> {
        let pixels = width as u64 * height as u64;
        if pixels > MAX_OUTPUT_PIXELS {
            return Err(PipelineError::Raster(format!(
                "output of {}x{} pixels exceeds the limit of {} pixels",
                width, height, MAX_OUTPUT_PIXELS
            )));
        }
        let reusable = matches!(&self.surface, Some(p) if p.width() == width && p.height() == height);
        if !reusable {
            let pixmap = Pixmap::new(width, height).ok_or_else(|| {
                PipelineError::Raster(format!("invalid surface size {}x{}", width, height))
            })?;
            self.surface = Some(pixmap);
        }
        self.surface
            .as_mut()
            .ok_or_else(|| PipelineError::Raster("render surface unavailable".into()))
    }
}

impl Rasterizer for SkiaRasterizer {
    fn rasterize(&mut self, scene: &SceneGraph, multiplier: f32) -> Result<RgbaImage> {
        if !(multiplier > 0.0) {
            return Err(PipelineError::Raster(format!(
                "multiplier must be positive, got {}",
                multiplier
            )));
        }
        let (width, height) = output_size(scene.width, scene.height, multiplier);
        let background = parse_color(&scene.background_color)?;
        let configured = self.font.clone();
        let font = configured.as_deref().map(Vec::as_slice).unwrap_or(FALLBACK_FONT);
        let transform = Transform::from_scale(multiplier, multiplier);

        let pixmap = self.surface(width, height)?;
        pixmap.fill(background);

        for (index, node) in scene.nodes.iter().enumerate() {
            if node.is_editor_only() {
                continue;
            }
            draw_node(pixmap, scene, index, node, font, transform)?;
        }

        Ok(to_rgba_image(pixmap))
    }
}

fn draw_node(
    pixmap: &mut Pixmap,
    scene: &SceneGraph,
    index: usize,
    node: &Node,
    font: &[u8],
    transform: Transform,
) -> Result<()> {
    match node {
        Node::Static(s) => match &s.content {
            StaticContent::Text { text, style, .. } => {
                draw_text(pixmap, &s.frame, text, style, font, transform)
            }
            StaticContent::Shape {
                shape,
                fill,
                stroke,
                stroke_width,
            } => draw_shape(
                pixmap,
                &s.frame,
                *shape,
                fill.as_deref(),
                stroke.as_deref(),
                *stroke_width,
                transform,
            ),
            StaticContent::Image { data } => draw_embedded_image(pixmap, &s.frame, data, transform),
        },
        Node::Variable(v) => {
            if let Some(placeholder) = &v.placeholder_style {
                draw_dashed_border(pixmap, &v.frame, &placeholder.border_color, transform)?;
                if placeholder.badge.is_some() {
                    draw_badge(pixmap, &v.frame, &placeholder.border_color, transform)?;
                }
            }
            draw_text(pixmap, &v.frame, &v.display_text, &v.style, font, transform)
        }
        Node::CodeMark(c) => match scene.code_mark(index) {
            Some(bitmap) => draw_code_mark(pixmap, &c.frame, bitmap, transform),
            None => {
                debug!("code mark node {} has no bitmap bound, skipping", index);
                Ok(())
            }
        },
        Node::VerificationLink(l) => {
            if let Some(authoring) = &l.authoring_style {
                draw_shape(
                    pixmap,
                    &l.frame,
                    ShapeKind::Rect,
                    authoring.background.as_deref(),
                    authoring.border.as_deref(),
                    1.0,
                    transform,
                )?;
            }
            draw_text(pixmap, &l.frame, &l.text, &l.style, font, transform)
        }
        Node::Guide(_) => Ok(()),
    }
}

/// Parses `#rgb`, `#rrggbb`, `#rrggbbaa` and `transparent`.
pub fn parse_color(value: &str) -> Result<Color> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("transparent") {
        return Ok(Color::TRANSPARENT);
    }
    let hex = value
        .strip_prefix('#')
        .ok_or_else(|| PipelineError::InvalidColor(value.to_string()))?;
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()
        .ok_or_else(|| PipelineError::InvalidColor(value.to_string()))?;

    let (r, g, b, a) = match digits.as_slice() {
        [r, g, b] => (r * 17, g * 17, b * 17, 255),
        [r1, r2, g1, g2, b1, b2] => (r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2, 255),
        [r1, r2, g1, g2, b1, b2, a1, a2] => {
            (r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2, a1 * 16 + a2)
        }
        _ => return Err(PipelineError::InvalidColor(value.to_string())),
    };
    Ok(Color::from_rgba8(r, g, b, a))
}

fn paint_for(color: &str) -> Result<Paint<'static>> {
    let mut paint = Paint::default();
    paint.set_color(parse_color(color)?);
    paint.anti_alias = true;
    Ok(paint)
}

fn frame_rect(frame: &Frame) -> Result<Rect> {
    Rect::from_xywh(frame.x, frame.y, frame.width, frame.height).ok_or_else(|| {
        PipelineError::Raster(format!(
            "invalid frame {}x{} at ({}, {})",
            frame.width, frame.height, frame.x, frame.y
        ))
    })
}

fn shape_path(frame: &Frame, shape: ShapeKind) -> Result<Path> {
    let rect = frame_rect(frame)?;
    match shape {
        ShapeKind::Rect => Ok(PathBuilder::from_rect(rect)),
        ShapeKind::Ellipse => PathBuilder::from_oval(rect)
            .ok_or_else(|| PipelineError::Raster("degenerate ellipse".into())),
    }
}

fn draw_shape(
    pixmap: &mut Pixmap,
    frame: &Frame,
    shape: ShapeKind,
    fill: Option<&str>,
    stroke: Option<&str>,
    stroke_width: f32,
    transform: Transform,
) -> Result<()> {
    let path = shape_path(frame, shape)?;
    if let Some(fill) = fill {
        pixmap.fill_path(&path, &paint_for(fill)?, FillRule::Winding, transform, None);
    }
    if let Some(color) = stroke {
        let stroke = Stroke {
            width: stroke_width.max(0.0),
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint_for(color)?, &stroke, transform, None);
    }
    Ok(())
}

fn draw_dashed_border(
    pixmap: &mut Pixmap,
    frame: &Frame,
    color: &str,
    transform: Transform,
) -> Result<()> {
    let path = shape_path(frame, ShapeKind::Rect)?;
    let stroke = Stroke {
        width: 1.0,
        dash: StrokeDash::new(vec![4.0, 3.0], 0.0),
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint_for(color)?, &stroke, transform, None);
    Ok(())
}

fn draw_badge(pixmap: &mut Pixmap, frame: &Frame, color: &str, transform: Transform) -> Result<()> {
    let size = (frame.height * 0.3).clamp(4.0, 12.0);
    let badge = Frame::new(frame.x, frame.y - size, size * 2.0, size);
    let rect = frame_rect(&badge)?;
    pixmap.fill_rect(rect, &paint_for(color)?, transform, None);
    Ok(())
}

fn draw_embedded_image(
    pixmap: &mut Pixmap,
    frame: &Frame,
    data: &str,
    transform: Transform,
) -> Result<()> {
    let bytes = BASE64.decode(data.trim())?;
    let decoded = image::load_from_memory(&bytes)?.to_rgba8();
    let source = premultiplied_pixmap(&decoded)?;
    draw_fitted(pixmap, frame, &source, FilterQuality::Bicubic, transform);
    Ok(())
}

fn draw_code_mark(
    pixmap: &mut Pixmap,
    frame: &Frame,
    bitmap: &GrayImage,
    transform: Transform,
) -> Result<()> {
    let rgba = RgbaImage::from_fn(bitmap.width(), bitmap.height(), |x, y| {
        let l = bitmap.get_pixel(x, y).0[0];
        image::Rgba([l, l, l, 255])
    });
    let source = premultiplied_pixmap(&rgba)?;
    // Nearest keeps module edges sharp for scanners.
    draw_fitted(pixmap, frame, &source, FilterQuality::Nearest, transform);
    Ok(())
}

/// Stretches `source` over `frame`.
fn draw_fitted(
    pixmap: &mut Pixmap,
    frame: &Frame,
    source: &Pixmap,
    quality: FilterQuality,
    transform: Transform,
) {
    let sx = frame.width / source.width() as f32;
    let sy = frame.height / source.height() as f32;
    let placement = transform.pre_translate(frame.x, frame.y).pre_scale(sx, sy);
    let paint = PixmapPaint {
        quality,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, placement, None);
}

fn premultiplied_pixmap(image: &RgbaImage) -> Result<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())
        .ok_or_else(|| PipelineError::Raster("empty image".into()))?;
    let mut data = image.as_raw().clone();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a < 255 {
            px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
            px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
            px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
        }
    }
    Pixmap::from_vec(data, size)
        .ok_or_else(|| PipelineError::Raster("could not wrap image pixels".into()))
}

fn draw_text(
    pixmap: &mut Pixmap,
    frame: &Frame,
    text: &str,
    style: &TextStyle,
    font: &[u8],
    transform: Transform,
) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let face = ttf_parser::Face::parse(font, 0)
        .map_err(|e| PipelineError::Raster(format!("font parse failed: {}", e)))?;
    let paint = paint_for(&style.color)?;
    let scale = style.font_size / face.units_per_em() as f32;
    let line_height = style.font_size * 1.2;
    let ascent = face.ascender() as f32 * scale;

    for (line_no, line) in text.lines().enumerate() {
        let glyphs: Vec<_> = line
            .chars()
            .map(|ch| face.glyph_index(ch).unwrap_or(ttf_parser::GlyphId(0)))
            .collect();
        let advance: f32 = glyphs
            .iter()
            .map(|g| face.glyph_hor_advance(*g).unwrap_or(0) as f32 * scale)
            .sum();
        let mut pen_x = match style.align {
            TextAlign::Left => frame.x,
            TextAlign::Center => frame.x + (frame.width - advance) / 2.0,
            TextAlign::Right => frame.x + frame.width - advance,
        };
        let baseline = frame.y + ascent + line_no as f32 * line_height;

        for glyph in glyphs {
            let mut builder = GlyphPathBuilder::new(pen_x, baseline, scale);
            if face.outline_glyph(glyph, &mut builder).is_some() {
                if let Some(path) = builder.finish() {
                    pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
                }
            }
            pen_x += face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
        }
    }
    Ok(())
}

/// Collects a glyph outline into canvas space. Font units are y-up, the canvas is y-down.
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn x(&self, x: f32) -> f32 {
        self.origin_x + x * self.scale
    }

    fn y(&self, y: f32) -> f32 {
        self.origin_y - y * self.scale
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.x(x), self.y(y));
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.x(x), self.y(y));
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1, x, y) = (self.x(x1), self.y(y1), self.x(x), self.y(y));
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = (self.x(x1), self.y(y1));
        let (x2, y2) = (self.x(x2), self.y(y2));
        let (x, y) = (self.x(x), self.y(y));
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

fn to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut out = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), out)
        .unwrap_or_else(|| RgbaImage::new(pixmap.width(), pixmap.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::code_mark::CodeMarkGenerator;
    use common::model::template::{CodeMarkNode, GuideNode, StaticNode};

    fn scene(nodes: Vec<Node>) -> SceneGraph {
        SceneGraph::new(200.0, 100.0, "#ffffff".into(), nodes)
    }

    fn red_box() -> Node {
        Node::Static(StaticNode {
            frame: Frame::new(10.0, 10.0, 20.0, 20.0),
            content: StaticContent::Shape {
                shape: ShapeKind::Rect,
                fill: Some("#ff0000".into()),
                stroke: None,
                stroke_width: 1.0,
            },
        })
    }

    #[test]
    fn same_scene_same_dimensions() {
        let mut rasterizer = SkiaRasterizer::new(None);
        let scene = scene(vec![red_box()]);
        let m = multiplier_for_dpi(PRINT_DPI);
        let a = rasterizer.rasterize(&scene, m).unwrap();
        let b = rasterizer.rasterize(&scene, m).unwrap();
        assert_eq!(a.dimensions(), b.dimensions());
        assert_eq!(a.dimensions(), output_size(200.0, 100.0, m));
        assert_eq!(a.dimensions(), (833, 417));
    }

    #[test]
    fn draws_shapes_at_scaled_positions() {
        let mut rasterizer = SkiaRasterizer::new(None);
        let bitmap = rasterizer.rasterize(&scene(vec![red_box()]), 2.0).unwrap();
        assert_eq!(bitmap.get_pixel(40, 40).0, [255, 0, 0, 255]);
        assert_eq!(bitmap.get_pixel(5, 5).0, [255, 255, 255, 255]);
    }

    #[test]
    fn guides_are_not_drawn() {
        let mut rasterizer = SkiaRasterizer::new(None);
        let guide = Node::Guide(GuideNode {
            frame: Frame::new(0.0, 0.0, 200.0, 100.0),
            color: Some("#000000".into()),
        });
        let bitmap = rasterizer.rasterize(&scene(vec![guide]), 1.0).unwrap();
        assert!(bitmap.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn surface_is_cleared_between_rows() {
        let mut rasterizer = SkiaRasterizer::new(None);
        rasterizer.rasterize(&scene(vec![red_box()]), 1.0).unwrap();
        let second = rasterizer.rasterize(&scene(vec![]), 1.0).unwrap();
        assert_eq!(second.get_pixel(20, 20).0, [255, 255, 255, 255]);
    }

    #[test]
    fn code_mark_bitmap_is_drawn() {
        let mut s = scene(vec![Node::CodeMark(CodeMarkNode {
            frame: Frame::new(100.0, 0.0, 100.0, 100.0),
            current_id: Some("x".into()),
            target_url: Some("https://v.example/x".into()),
        })]);
        let bitmap = CodeMarkGenerator::default()
            .generate("https://v.example/x")
            .unwrap();
        s.bind_code_mark(0, bitmap);

        let out = SkiaRasterizer::new(None).rasterize(&s, 1.0).unwrap();
        let dark = out
            .enumerate_pixels()
            .filter(|(x, _, p)| *x >= 100 && p.0[0] < 128)
            .count();
        assert!(dark > 0);
        let dark_left = out
            .enumerate_pixels()
            .filter(|(x, _, p)| *x < 100 && p.0[0] < 128)
            .count();
        assert_eq!(dark_left, 0);
    }

    #[test]
    fn bad_colour_is_an_error() {
        let mut s = scene(vec![]);
        s.background_color = "blue-ish".into();
        let err = SkiaRasterizer::new(None).rasterize(&s, 1.0).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidColor(_)));
    }

    #[test]
    fn bad_image_data_is_an_error() {
        let node = Node::Static(StaticNode {
            frame: Frame::new(0.0, 0.0, 10.0, 10.0),
            content: StaticContent::Image {
                data: "not base64!".into(),
            },
        });
        assert!(SkiaRasterizer::new(None)
            .rasterize(&scene(vec![node]), 1.0)
            .is_err());
    }

    fn text_node(text: &str, frame: Frame, align: TextAlign) -> Node {
        Node::Variable(common::model::template::VariableNode {
            frame,
            bound_column: "name".into(),
            display_text: text.into(),
            style: TextStyle {
                font_size: 24.0,
                align,
                ..TextStyle::default()
            },
            placeholder_style: None,
        })
    }

    /// Pixels whose red channel is below 128, as `(x, y)`.
    fn ink(bitmap: &RgbaImage) -> Vec<(u32, u32)> {
        bitmap
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] < 128)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn default_config_still_draws_text() {
        let font = crate::config::AppConfig::default().load_assets().font;
        let mut rasterizer = SkiaRasterizer::new(font);
        let frame = Frame::new(20.0, 20.0, 160.0, 40.0);
        let bitmap = rasterizer
            .rasterize(&scene(vec![text_node("Ada", frame, TextAlign::Left)]), 1.0)
            .unwrap();

        let ink = ink(&bitmap);
        assert!(ink.len() > 50, "only {} dark pixels", ink.len());
        for (x, y) in ink {
            assert!((20..180).contains(&x) && (20..60).contains(&y), "ink at ({x}, {y})");
        }
    }

    #[test]
    fn alignment_moves_the_ink() {
        let frame = Frame::new(10.0, 20.0, 180.0, 40.0);
        let leftmost = |align| {
            let bitmap = SkiaRasterizer::new(None)
                .rasterize(&scene(vec![text_node("Ada", frame, align)]), 1.0)
                .unwrap();
            ink(&bitmap).iter().map(|(x, _)| *x).min().unwrap()
        };
        let left = leftmost(TextAlign::Left);
        let center = leftmost(TextAlign::Center);
        let right = leftmost(TextAlign::Right);
        assert!(left < 20, "left edge at {left}");
        assert!(left + 40 < center, "{left} vs {center}");
        assert!(center + 40 < right, "{center} vs {right}");
    }

    #[test]
    fn unresolved_placeholder_keeps_text_and_border() {
        use crate::pipeline::instantiate::TemplateInstantiator;
        use common::model::record::GenerationId;
        use common::model::row::DataRow;
        use common::model::template::{PlaceholderStyle, Template, VariableNode};

        let template = Template {
            width: 200.0,
            height: 100.0,
            background_color: "#ffffff".into(),
            nodes: vec![Node::Variable(VariableNode {
                frame: Frame::new(20.0, 20.0, 160.0, 50.0),
                bound_column: "name".into(),
                display_text: "{{name}}".into(),
                style: TextStyle::default(),
                placeholder_style: Some(PlaceholderStyle::default()),
            })],
        };
        let instantiator =
            TemplateInstantiator::new("https://v.example", CodeMarkGenerator::default());
        let id = GenerationId::new("abc");
        let blue = |bitmap: &RgbaImage| {
            bitmap
                .pixels()
                .filter(|p| p.0[2] as i32 - p.0[0] as i32 > 60)
                .count()
        };

        let missing = instantiator
            .instantiate(&template, &DataRow::new().with("course", "Rust"), &id)
            .unwrap();
        let bitmap = SkiaRasterizer::new(None)
            .rasterize(&missing.scene, 1.0)
            .unwrap();
        assert!(blue(&bitmap) > 20, "dashed border missing");
        assert!(ink(&bitmap).len() > 50, "placeholder text missing");

        let resolved = instantiator
            .instantiate(&template, &DataRow::new().with("name", "Ada"), &id)
            .unwrap();
        let bitmap = SkiaRasterizer::new(None)
            .rasterize(&resolved.scene, 1.0)
            .unwrap();
        assert_eq!(blue(&bitmap), 0);
        assert!(!ink(&bitmap).is_empty());
    }

    #[test]
    fn oversized_output_is_rejected_before_allocating() {
        let huge = SceneGraph::new(20_000.0, 20_000.0, "#ffffff".into(), vec![]);
        let err = SkiaRasterizer::new(None)
            .rasterize(&huge, multiplier_for_dpi(PRINT_DPI))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Raster(msg) if msg.contains("exceeds")));
    }

    #[test]
    fn parses_colours() {
        let c = parse_color("#f00").unwrap();
        assert_eq!(c, Color::from_rgba8(255, 0, 0, 255));
        let c = parse_color("#00ff0080").unwrap();
        assert_eq!(c, Color::from_rgba8(0, 255, 0, 128));
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("red").is_err());
        assert_eq!(parse_color("transparent").unwrap(), Color::TRANSPARENT);
    }
}
