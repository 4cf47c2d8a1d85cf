//! Editing state behind the canvas, and the session that debounces repaints
//! and guards export while a paint is in flight.

use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::canvas::{self, Background, TextLayer};
use crate::data::ImageData;
use crate::debounce::Debouncer;
use crate::fit::{self, DrawSurface, QuoteText, Surface, TextMeasure, WrappedLayout};
use crate::font::FontBook;
use crate::settings::Settings;
use crate::style::{self, TextStyle};

pub const NOT_READY_MESSAGE: &str = "canvas or quote is not ready for sharing";
pub const BUSY_MESSAGE: &str = "surface is busy";

#[derive(Debug, Clone)]
pub struct EditorState {
    quote: String,
    style: TextStyle,
    default_style: TextStyle,
    fonts: Vec<String>,
    overlay_opacity: f32,
    background: Option<Background>,
    text_layer: Option<TextLayer>,
    layout: Option<WrappedLayout>,
}

impl EditorState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            quote: String::new(),
            style: settings.text_style.clone(),
            default_style: settings.text_style.clone(),
            fonts: settings.fonts.clone(),
            overlay_opacity: settings.overlay_opacity,
            background: None,
            text_layer: None,
            layout: None,
        }
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn layout(&self) -> Option<&WrappedLayout> {
        self.layout.as_ref()
    }

    pub fn text_layer(&self) -> Option<&TextLayer> {
        self.text_layer.as_ref()
    }

    pub fn surface(&self) -> Option<Surface> {
        self.background.as_ref().map(Background::surface)
    }

    /// Editing controls are enabled once a background is loaded.
    pub fn is_enabled(&self) -> bool {
        self.background.is_some()
    }

    pub fn load_background(&mut self, image: ImageData) -> Result<Surface> {
        let background = Background::decode(image)?;
        let surface = background.surface();
        self.background = Some(background);
        self.text_layer = Some(TextLayer::new(surface));
        self.layout = None;
        Ok(surface)
    }

    pub fn set_quote(&mut self, quote: impl Into<String>) {
        self.quote = quote.into();
    }

    pub fn set_color(&mut self, color: &str) -> Result<()> {
        self.style.color = style::normalize_hex_color(color)?;
        Ok(())
    }

    pub fn set_font_size(&mut self, size: u32) {
        self.style.font_size = style::clamp_font_size(size);
    }

    pub fn set_font_family(&mut self, family: &str) -> Result<()> {
        if !self.fonts.iter().any(|font| font == family) {
            return Err(anyhow!("unknown font family '{}'", family));
        }
        self.style.font_family = family.to_string();
        Ok(())
    }

    /// Resets quote and style and drops both layers.
    pub fn clear(&mut self) {
        self.quote.clear();
        self.style = self.default_style.clone();
        self.background = None;
        self.text_layer = None;
        self.layout = None;
    }

    /// Re-fits the quote and repaints the text layer. No-op without a
    /// background.
    pub fn repaint(&mut self, measure: &dyn TextMeasure) -> Option<&WrappedLayout> {
        let layer = self.text_layer.as_mut()?;
        let quote = QuoteText::parse(&self.quote);
        let layout = fit::fit(&quote, &self.style, layer.size(), measure);
        fit::paint(layer, &layout, &self.style);
        debug!(
            "repainted {} paragraphs ({} blank) as {} lines at {}px",
            quote.paragraph_count(),
            quote.blank_paragraphs(),
            layout.lines.len(),
            layout.font_size
        );
        self.layout = Some(layout);
        self.layout.as_ref()
    }

    /// Repaints and serializes the composite of both layers.
    pub fn export(&mut self, mime: &str, fonts: &FontBook) -> Result<Vec<u8>> {
        if self.background.is_none() || !QuoteText::parse(&self.quote).has_content() {
            return Err(anyhow!(NOT_READY_MESSAGE));
        }
        self.repaint(fonts);
        let (Some(background), Some(layer)) = (self.background.as_ref(), self.text_layer.as_ref())
        else {
            return Err(anyhow!(NOT_READY_MESSAGE));
        };
        canvas::compose(
            background,
            layer,
            self.overlay_opacity,
            mime,
            fonts.database(),
        )
    }
}

/// Shares an [`EditorState`] between the edit path and export.
///
/// The state mutex doubles as the surface-busy flag: a repaint holds it,
/// [`Session::try_export`] fails fast while it is held and
/// [`Session::export`] waits for it.
pub struct Session {
    state: Arc<Mutex<EditorState>>,
    fonts: Arc<FontBook>,
    debouncer: Debouncer,
}

impl Session {
    pub fn new(state: EditorState, fonts: Arc<FontBook>, delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            fonts,
            debouncer: Debouncer::new(delay),
        }
    }

    /// Applies `change` and schedules a debounced repaint.
    pub async fn edit<R>(&self, change: impl FnOnce(&mut EditorState) -> R) -> R {
        let result = {
            let mut state = self.state.lock().await;
            change(&mut state)
        };
        self.schedule_repaint();
        result
    }

    fn schedule_repaint(&self) {
        let state = self.state.clone();
        let fonts = self.fonts.clone();
        self.debouncer.schedule(async move {
            let mut state = state.lock().await;
            state.repaint(fonts.as_ref());
        });
    }

    pub fn is_repaint_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub async fn layout(&self) -> Option<WrappedLayout> {
        self.state.lock().await.layout().cloned()
    }

    /// Runs the pending repaint now instead of waiting out the delay.
    pub async fn flush(&self) -> Option<WrappedLayout> {
        let mut state = self.state.lock().await;
        self.debouncer.cancel();
        state.repaint(self.fonts.as_ref()).cloned()
    }

    pub fn try_export(&self, mime: &str) -> Result<Vec<u8>> {
        let mut state = self
            .state
            .try_lock()
            .map_err(|_| anyhow!(BUSY_MESSAGE))?;
        self.debouncer.cancel();
        state.export(mime, &self.fonts)
    }

    pub async fn export(&self, mime: &str) -> Result<Vec<u8>> {
        let mut state = self.state.lock().await;
        self.debouncer.cancel();
        state.export(mime, &self.fonts)
    }
}
