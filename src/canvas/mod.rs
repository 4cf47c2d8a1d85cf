//! Background and text layers, and their composite export.

mod render;

use anyhow::{Context, Result};
use std::io::Cursor;
use std::sync::Arc;
use tracing::info;
use usvg::fontdb;

use crate::data::{self, ImageData};
use crate::fit::{DrawSurface, Pen, Surface};
use render::{escape_xml, rasterize, svg_open};

pub const DEFAULT_OVERLAY_OPACITY: f32 = 0.5;

/// A decoded background photo; its pixel size becomes the canvas size.
#[derive(Debug, Clone)]
pub struct Background {
    image: ImageData,
    surface: Surface,
}

impl Background {
    pub fn decode(image: ImageData) -> Result<Self> {
        let (width, height) = image::ImageReader::new(Cursor::new(&image.bytes))
            .with_guessed_format()
            .with_context(|| "failed to read background image")?
            .into_dimensions()
            .with_context(|| "failed to decode background image")?;
        // The rasterizer only embeds PNG and JPEG reliably.
        let image = if data::image_format_from_mime(&image.mime).is_some() {
            image
        } else {
            reencode_png(&image.bytes)?
        };
        info!("background loaded ({}x{}, {})", width, height, image.mime);
        Ok(Self {
            image,
            surface: Surface::new(width, height),
        })
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    fn svg_fragment(&self, overlay_opacity: f32) -> String {
        let uri = self.image.to_data_url();
        let Surface { width, height } = self.surface;
        let mut svg = format!(
            r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
            uri = uri,
            w = width,
            h = height
        );
        let opacity = overlay_opacity.clamp(0.0, 1.0);
        if opacity > 0.0 {
            svg.push_str(&format!(
                r##"<rect x="0" y="0" width="{w}" height="{h}" fill="#000000" fill-opacity="{o}"/>"##,
                w = width,
                h = height,
                o = opacity
            ));
        }
        svg
    }
}

fn reencode_png(bytes: &[u8]) -> Result<ImageData> {
    let decoded =
        image::load_from_memory(bytes).with_context(|| "failed to decode background image")?;
    let mut out = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .with_context(|| "failed to convert background to PNG")?;
    Ok(ImageData {
        bytes: out,
        mime: data::PNG_MIME.to_string(),
    })
}

/// Transparent layer holding the painted quote as SVG text elements.
#[derive(Debug, Clone)]
pub struct TextLayer {
    surface: Surface,
    elements: Vec<String>,
}

impl TextLayer {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            elements: Vec::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn svg_fragment(&self) -> String {
        self.elements.concat()
    }
}

impl DrawSurface for TextLayer {
    fn size(&self) -> Surface {
        self.surface
    }

    fn clear(&mut self) {
        self.elements.clear();
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, pen: &Pen) {
        if text.trim().is_empty() {
            return;
        }
        self.elements.push(format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" font-family="{family}, sans-serif" fill="{color}" text-anchor="middle" xml:space="preserve">{text}</text>"#,
            x = x,
            y = y,
            size = pen.size,
            family = escape_xml(&pen.family),
            color = escape_xml(&pen.color),
            text = escape_xml(text)
        ));
    }
}

/// Draws `layer` over `background` and encodes the result as `mime`.
pub fn compose(
    background: &Background,
    layer: &TextLayer,
    overlay_opacity: f32,
    mime: &str,
    fontdb: Arc<fontdb::Database>,
) -> Result<Vec<u8>> {
    let Surface { width, height } = background.surface();
    let mut svg = svg_open(width, height);
    svg.push_str(&background.svg_fragment(overlay_opacity));
    svg.push_str(&layer.svg_fragment());
    svg.push_str("</svg>");
    rasterize(&svg, mime, fontdb)
}
