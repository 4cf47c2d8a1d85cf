use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod canvas;
pub mod data;
pub mod debounce;
pub mod editor;
pub mod fit;
pub mod font;
pub mod logging;
mod paths;
pub mod server;
pub mod settings;
pub mod style;
#[cfg(test)]
mod test_util;
pub mod upload;

pub use editor::{EditorState, Session};
pub use fit::{QuoteText, Surface, TextMeasure, WrappedLayout, fit, fit_surface};
pub use font::{EstimatedMetrics, FontBook};
pub use style::TextStyle;
pub use upload::{UploadReceipt, UploadRequest, UploadService};

const DEFAULT_OUTPUT_STEM: &str = "quote";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub background: Option<String>,
    pub output: Option<String>,
    pub output_mime: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<u32>,
    pub color: Option<String>,
    pub settings_path: Option<String>,
    pub layout_only: bool,
    pub upload: bool,
    pub show_fonts: bool,
    pub show_colors: bool,
}

/// Renders `input` over the configured background. Returns what should be
/// printed: the layout as JSON, the upload URL, or the written file path.
pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    if config.show_fonts || config.show_colors {
        return Ok(format_show_output(&config, &settings));
    }

    let input = input.unwrap_or_default();
    let quote = input.trim_end_matches(['\r', '\n']);
    if quote.trim().is_empty() {
        return Err(anyhow!("quote is empty"));
    }
    let background = config
        .background
        .as_deref()
        .ok_or_else(|| anyhow!("--background is required to render a quote"))?;
    let image = data::load_image(Path::new(background))?;
    let mime = resolve_mime(&config, &settings)?;

    let fonts = Arc::new(FontBook::new(settings.fonts_dir.as_deref()));
    let session = Session::new(
        EditorState::new(&settings),
        fonts,
        Duration::from_millis(settings.debounce_ms),
    );
    let surface = session
        .edit(|state| -> Result<Surface> {
            let surface = state.load_background(image)?;
            state.set_quote(quote);
            if let Some(family) = config.font_family.as_deref() {
                state.set_font_family(family)?;
            }
            if let Some(size) = config.font_size {
                state.set_font_size(size);
            }
            if let Some(color) = config.color.as_deref() {
                state.set_color(color)?;
            }
            Ok(surface)
        })
        .await?;
    info!("background is {}x{}", surface.width, surface.height);

    if config.layout_only {
        let layout = session
            .flush()
            .await
            .ok_or_else(|| anyhow!("no layout was produced"))?;
        return serde_json::to_string_pretty(&layout).with_context(|| "failed to serialize layout");
    }

    let bytes = session.export(mime).await?;

    if config.upload {
        let uploader = upload::build_upload_service(&settings)?;
        let receipt = uploader
            .upload(UploadRequest {
                bytes,
                mime: mime.to_string(),
                quote: Some(quote.to_string()),
            })
            .await?;
        return Ok(receipt.url);
    }

    let output = output_path(&config, mime);
    std::fs::write(&output, &bytes)
        .with_context(|| format!("failed to write output: {}", output.display()))?;
    Ok(output.display().to_string())
}

fn resolve_mime(config: &Config, settings: &settings::Settings) -> Result<&'static str> {
    if let Some(mime) = config.output_mime.as_deref() {
        return data::resolve_output_mime(mime);
    }
    if let Some(ext) = config
        .output
        .as_deref()
        .and_then(|output| Path::new(output).extension())
        .and_then(|ext| ext.to_str())
    {
        return data::resolve_output_mime(ext);
    }
    data::resolve_output_mime(&settings.output_mime)
}

fn output_path(config: &Config, mime: &str) -> PathBuf {
    match config.output.as_deref() {
        Some(output) => PathBuf::from(output),
        None => {
            let ext = data::extension_from_mime(mime).unwrap_or("jpeg");
            PathBuf::from(format!("{}.{}", DEFAULT_OUTPUT_STEM, ext))
        }
    }
}

fn format_show_output(config: &Config, settings: &settings::Settings) -> String {
    let mut sections = Vec::new();
    if config.show_fonts {
        let lines = settings
            .fonts
            .iter()
            .map(|font| {
                if *font == settings.text_style.font_family {
                    format!("{}\t(default)", font)
                } else {
                    font.clone()
                }
            })
            .collect::<Vec<_>>();
        sections.push(lines.join("\n"));
    }
    if config.show_colors {
        sections.push(settings.colors.join("\n"));
    }
    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::png_bytes;
    use crate::test_util::with_temp_base_dir;

    fn run_blocking(config: Config, input: Option<&str>) -> Result<String> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime")
            .block_on(run(config, input.map(str::to_string)))
    }

    #[test]
    fn show_fonts_marks_the_default() {
        with_temp_base_dir(|_| {
            let config = Config {
                show_fonts: true,
                ..Config::default()
            };
            let output = run_blocking(config, None).expect("run");
            assert!(output.contains("BrittanySignature\t(default)"));
            assert!(output.lines().any(|line| line == "Cambria"));
        });
    }

    #[test]
    fn empty_quote_is_an_error() {
        with_temp_base_dir(|_| {
            let err = run_blocking(Config::default(), Some("\n")).unwrap_err();
            assert_eq!(err.to_string(), "quote is empty");
        });
    }

    #[test]
    fn layout_only_prints_json() {
        with_temp_base_dir(|dir| {
            let background = dir.join("bg.png");
            std::fs::write(&background, png_bytes(400, 200)).unwrap();
            let config = Config {
                background: Some(background.display().to_string()),
                font_size: Some(30),
                layout_only: true,
                ..Config::default()
            };
            let output = run_blocking(config, Some("Hello\n")).expect("run");
            let value: serde_json::Value = serde_json::from_str(&output).unwrap();
            assert_eq!(value["lines"], serde_json::json!(["Hello"]));
            assert_eq!(value["fontSize"], 30);
        });
    }

    #[test]
    fn renders_to_requested_output() {
        with_temp_base_dir(|dir| {
            let background = dir.join("bg.png");
            std::fs::write(&background, png_bytes(120, 80)).unwrap();
            let output = dir.join("out.png");
            let config = Config {
                background: Some(background.display().to_string()),
                output: Some(output.display().to_string()),
                ..Config::default()
            };
            let printed = run_blocking(config, Some("Hi there")).expect("run");
            assert_eq!(printed, output.display().to_string());
            let decoded = image::open(&output).expect("decode");
            assert_eq!((decoded.width(), decoded.height()), (120, 80));
        });
    }

    #[test]
    fn upload_goes_to_local_backend() {
        with_temp_base_dir(|dir| {
            let background = dir.join("bg.png");
            std::fs::write(&background, png_bytes(60, 40)).unwrap();
            let config = Config {
                background: Some(background.display().to_string()),
                upload: true,
                ..Config::default()
            };
            let url = run_blocking(config, Some("Hi")).expect("run");
            assert!(url.starts_with("/uploaded/"));
            assert!(url.ends_with(".jpeg"));
            let stored = dir.join("public").join(url.trim_start_matches('/'));
            assert!(stored.is_file());
        });
    }
}
