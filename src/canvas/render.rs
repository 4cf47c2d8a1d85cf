use anyhow::{Context, Result, anyhow};
use resvg::render;
use std::io::Cursor;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use crate::data::image_format_from_mime;

pub(crate) fn svg_open(width: u32, height: u32) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    )
}

pub(crate) fn rasterize(
    svg: &str,
    output_mime: &str,
    fontdb: Arc<fontdb::Database>,
) -> Result<Vec<u8>> {
    let options = Options {
        fontdb,
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse canvas SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty canvas size"))?;
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    let image = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.take())
        .ok_or_else(|| anyhow!("failed to build image buffer from canvas"))?;
    let format = image_format_from_mime(output_mime)
        .ok_or_else(|| anyhow!("unsupported output image mime '{}'", output_mime))?;
    // JPEG has no alpha channel.
    let image = match format {
        image::ImageFormat::Jpeg => {
            image::DynamicImage::ImageRgb8(image::DynamicImage::ImageRgba8(image).to_rgb8())
        }
        _ => image::DynamicImage::ImageRgba8(image),
    };
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .with_context(|| "failed to encode canvas image")?;
    Ok(bytes)
}

pub(crate) fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml(r#"<b>"a" & 'b'</b>"#), "&lt;b&gt;&quot;a&quot; &amp; &apos;b&apos;&lt;/b&gt;");
    }

    #[test]
    fn rasterizes_plain_svg_to_png() {
        let svg = format!(
            r##"{}<rect x="0" y="0" width="8" height="6" fill="#ff0000"/></svg>"##,
            svg_open(8, 6)
        );
        let bytes = rasterize(&svg, "image/png", Arc::new(fontdb::Database::new())).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn unsupported_mime_is_rejected() {
        let svg = format!("{}</svg>", svg_open(4, 4));
        assert!(rasterize(&svg, "image/gif", Arc::new(fontdb::Database::new())).is_err());
    }
}
