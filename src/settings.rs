use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::canvas::DEFAULT_OVERLAY_OPACITY;
use crate::data;
use crate::paths;
use crate::style::{self, TextStyle};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

pub const DEFAULT_DEBOUNCE_MS: u64 = 100;
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_ASSET_HOST_API: &str = "https://api.cloudinary.com";
pub const DEFAULT_ASSET_HOST_DELIVERY: &str = "https://res.cloudinary.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadBackend {
    Local,
    AssetHost,
}

impl UploadBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" | "fs" | "filesystem" => Ok(Self::Local),
            "asset_host" | "asset-host" | "cloudinary" => Ok(Self::AssetHost),
            other => Err(anyhow!(
                "unknown upload backend '{}' (expected local or asset_host)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetHostSettings {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub api_base: String,
    pub delivery_base: String,
    pub context: BTreeMap<String, String>,
}

impl Default for AssetHostSettings {
    fn default() -> Self {
        Self {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            api_base: DEFAULT_ASSET_HOST_API.to_string(),
            delivery_base: DEFAULT_ASSET_HOST_DELIVERY.to_string(),
            context: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub text_style: TextStyle,
    pub fonts: Vec<String>,
    pub colors: Vec<String>,
    pub overlay_opacity: f32,
    pub output_mime: String,
    pub fonts_dir: Option<PathBuf>,
    pub debounce_ms: u64,
    pub upload_backend: UploadBackend,
    pub public_dir: PathBuf,
    pub asset_host: AssetHostSettings,
    pub server_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_style: TextStyle::default(),
            fonts: style::DEFAULT_FONTS.iter().map(|f| f.to_string()).collect(),
            colors: style::DEFAULT_COLORS.iter().map(|c| c.to_string()).collect(),
            overlay_opacity: DEFAULT_OVERLAY_OPACITY,
            output_mime: data::JPEG_MIME.to_string(),
            fonts_dir: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            upload_backend: UploadBackend::Local,
            public_dir: paths::default_public_dir(),
            asset_host: AssetHostSettings::default(),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    text: Option<TextSettings>,
    canvas: Option<CanvasSettings>,
    upload: Option<UploadSettings>,
    asset_host: Option<AssetHostFile>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct TextSettings {
    font_family: Option<String>,
    font_size: Option<u32>,
    color: Option<String>,
    fonts: Option<Vec<String>>,
    colors: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct CanvasSettings {
    overlay_opacity: Option<f32>,
    output_mime: Option<String>,
    fonts_dir: Option<String>,
    debounce_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct UploadSettings {
    backend: Option<String>,
    public_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetHostFile {
    cloud_name: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
    api_base: Option<String>,
    delivery_base: Option<String>,
    context: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
}

/// Loads built-in defaults, then every settings file that exists, in order:
/// `./settings.toml`, `./settings.local.toml`, `<base>/settings.toml`,
/// `<base>/settings.local.toml` and finally `extra_path`.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = paths::settings_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings
                .merge(parsed)
                .with_context(|| format!("invalid settings: {}", path.display()))?;
        }
    }

    settings.apply_env();
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(text) = incoming.text {
            if let Some(family) = non_empty(text.font_family) {
                self.text_style.font_family = family;
            }
            if let Some(size) = text.font_size {
                self.text_style.font_size = style::clamp_font_size(size);
            }
            if let Some(color) = non_empty(text.color) {
                self.text_style.color = style::normalize_hex_color(&color)?;
            }
            if let Some(fonts) = text.fonts {
                if !fonts.is_empty() {
                    self.fonts = fonts;
                }
            }
            if let Some(colors) = text.colors {
                if !colors.is_empty() {
                    self.colors = colors
                        .iter()
                        .map(|color| style::normalize_hex_color(color))
                        .collect::<Result<_>>()?;
                }
            }
            if !self.is_known_font(&self.text_style.font_family) {
                return Err(anyhow!(
                    "default font family '{}' is not in [text] fonts",
                    self.text_style.font_family
                ));
            }
        }
        if let Some(canvas) = incoming.canvas {
            if let Some(opacity) = canvas.overlay_opacity {
                self.overlay_opacity = opacity.clamp(0.0, 1.0);
            }
            if let Some(mime) = non_empty(canvas.output_mime) {
                self.output_mime = data::resolve_output_mime(&mime)?.to_string();
            }
            if let Some(dir) = canvas.fonts_dir.as_deref().and_then(paths::resolve_dir) {
                self.fonts_dir = Some(dir);
            }
            if let Some(ms) = canvas.debounce_ms {
                self.debounce_ms = ms;
            }
        }
        if let Some(upload) = incoming.upload {
            if let Some(backend) = non_empty(upload.backend) {
                self.upload_backend = UploadBackend::parse(&backend)?;
            }
            if let Some(dir) = upload.public_dir.as_deref().and_then(paths::resolve_dir) {
                self.public_dir = dir;
            }
        }
        if let Some(host) = incoming.asset_host {
            if let Some(value) = non_empty(host.cloud_name) {
                self.asset_host.cloud_name = Some(value);
            }
            if let Some(value) = non_empty(host.api_key) {
                self.asset_host.api_key = Some(value);
            }
            if let Some(value) = non_empty(host.api_secret) {
                self.asset_host.api_secret = Some(value);
            }
            if let Some(value) = non_empty(host.api_base) {
                self.asset_host.api_base = value.trim_end_matches('/').to_string();
            }
            if let Some(value) = non_empty(host.delivery_base) {
                self.asset_host.delivery_base = value.trim_end_matches('/').to_string();
            }
            if let Some(context) = host.context {
                self.asset_host.context.extend(context);
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = non_empty(server.addr) {
                self.server_addr = addr;
            }
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Some(value) = env_value("CLOUDINARY_CLOUD_NAME") {
            self.asset_host.cloud_name = Some(value);
        }
        if let Some(value) = env_value("CLOUDINARY_API_KEY") {
            self.asset_host.api_key = Some(value);
        }
        if let Some(value) = env_value("CLOUDINARY_API_SECRET") {
            self.asset_host.api_secret = Some(value);
        }
    }

    pub fn is_known_font(&self, family: &str) -> bool {
        self.fonts.iter().any(|font| font == family)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn env_value(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = paths::settings_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}
