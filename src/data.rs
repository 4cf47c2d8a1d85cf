use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::path::Path;

pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";
pub const WEBP_MIME: &str = "image/webp";
pub const GIF_MIME: &str = "image/gif";
pub const BMP_MIME: &str = "image/bmp";

/// Raw image bytes with a detected mime type.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl ImageData {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }
}

pub fn load_image(path: &Path) -> Result<ImageData> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read image file: {}", path.display()))?;
    let mime = detect_image_mime(&bytes, Some(path))?;
    Ok(ImageData { bytes, mime })
}

pub fn image_from_bytes(bytes: Vec<u8>) -> Result<ImageData> {
    let mime = detect_image_mime(&bytes, None)?;
    Ok(ImageData { bytes, mime })
}

/// Decodes `data:<mime>;base64,<payload>` or bare base64 image data.
pub fn parse_data_url(value: &str) -> Result<ImageData> {
    let value = value.trim();
    if value.is_empty() {
        return Err(anyhow!("image data is empty"));
    }
    let (declared, payload) = match value.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| anyhow!("malformed data URL"))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| anyhow!("data URL must be base64 encoded"))?;
            (Some(mime.trim().to_ascii_lowercase()), payload)
        }
        None => (None, value),
    };
    let bytes = BASE64
        .decode(payload.trim())
        .with_context(|| "failed to decode base64 image data")?;
    let mime = match sniff_image_mime(&bytes) {
        Some(mime) => mime.to_string(),
        None => declared
            .filter(|mime| mime.starts_with("image/"))
            .ok_or_else(|| anyhow!("image data is not a recognized image"))?,
    };
    Ok(ImageData { bytes, mime })
}

/// Maps user input such as `jpg` or `image/png` to an encodable output mime.
pub fn resolve_output_mime(input: &str) -> Result<&'static str> {
    match input.trim().to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "image/jpg" | JPEG_MIME => Ok(JPEG_MIME),
        "png" | PNG_MIME => Ok(PNG_MIME),
        other => Err(anyhow!(
            "unsupported output mime '{}' (expected image/jpeg or image/png)",
            other
        )),
    }
}

fn detect_image_mime(bytes: &[u8], path: Option<&Path>) -> Result<String> {
    if let Some(detected) = sniff_image_mime(bytes) {
        return Ok(detected.to_string());
    }
    if let Some(mime) = path
        .and_then(|path| path.extension())
        .and_then(|value| value.to_str())
        .and_then(|ext| mime_from_extension(&ext.to_ascii_lowercase()))
    {
        return Ok(mime.to_string());
    }
    Err(anyhow!(
        "unable to detect image type for '{}'",
        path.map(|value| value.display().to_string())
            .unwrap_or_else(|| "input".to_string())
    ))
}

fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    let kind = infer::get(bytes)?;
    let detected = kind.mime_type();
    detected.starts_with("image/").then_some(detected)
}

fn mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "png" => Some(PNG_MIME),
        "jpg" | "jpeg" => Some(JPEG_MIME),
        "webp" => Some(WEBP_MIME),
        "gif" => Some(GIF_MIME),
        "bmp" => Some(BMP_MIME),
        _ => None,
    }
}

pub fn extension_from_mime(mime: &str) -> Option<&'static str> {
    match mime {
        PNG_MIME => Some("png"),
        JPEG_MIME | "image/jpg" => Some("jpeg"),
        WEBP_MIME => Some("webp"),
        GIF_MIME => Some("gif"),
        BMP_MIME => Some("bmp"),
        _ => None,
    }
}

pub(crate) fn image_format_from_mime(mime: &str) -> Option<image::ImageFormat> {
    match mime {
        PNG_MIME => Some(image::ImageFormat::Png),
        JPEG_MIME | "image/jpg" => Some(image::ImageFormat::Jpeg),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbImage::from_pixel(width, height, image::Rgb([30, 60, 90]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    #[test]
    fn data_url_round_trips_through_sniffing() {
        let data = ImageData {
            bytes: png_bytes(4, 4),
            mime: PNG_MIME.to_string(),
        };
        let parsed = parse_data_url(&data.to_data_url()).expect("parse");
        assert_eq!(parsed.mime, PNG_MIME);
        assert_eq!(parsed.bytes, data.bytes);
    }

    #[test]
    fn bare_base64_is_accepted() {
        let encoded = BASE64.encode(png_bytes(2, 2));
        let parsed = parse_data_url(&encoded).expect("parse");
        assert_eq!(parsed.mime, PNG_MIME);
    }

    #[test]
    fn rejects_non_image_payloads() {
        let encoded = format!("data:text/plain;base64,{}", BASE64.encode(b"hello"));
        assert!(parse_data_url(&encoded).is_err());
        assert!(parse_data_url("").is_err());
        assert!(parse_data_url("data:image/png,raw").is_err());
    }

    #[test]
    fn output_mime_aliases() {
        assert_eq!(resolve_output_mime("JPG").unwrap(), JPEG_MIME);
        assert_eq!(resolve_output_mime("image/png").unwrap(), PNG_MIME);
        assert!(resolve_output_mime("gif").is_err());
    }
}
