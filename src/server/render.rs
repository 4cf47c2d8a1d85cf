use anyhow::Result;
use tracing::info;

use crate::data::{self, ImageData};
use crate::editor::{EditorState, NOT_READY_MESSAGE};
use crate::upload::UploadRequest;

use super::error::ServerError;
use super::models::{RenderRequest, RenderResponse};
use super::state::ServerState;

pub(crate) const NO_IMAGE_DATA: &str = "No image data provided";

pub(crate) async fn render_request(
    state: &ServerState,
    request: RenderRequest,
) -> Result<RenderResponse, ServerError> {
    let background = request
        .background
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ServerError::bad_request(NO_IMAGE_DATA))?;
    if request.quote.trim().is_empty() {
        return Err(ServerError::bad_request(NOT_READY_MESSAGE));
    }
    let image =
        data::parse_data_url(background).map_err(|err| ServerError::bad_request(err.to_string()))?;
    let mime = data::resolve_output_mime(
        request
            .format
            .as_deref()
            .unwrap_or(state.settings.output_mime.as_str()),
    )
    .map_err(|err| ServerError::bad_request(err.to_string()))?;

    let mut editor = EditorState::new(&state.settings);
    editor
        .load_background(image)
        .map_err(|err| ServerError::bad_request(err.to_string()))?;
    editor.set_quote(request.quote.clone());
    if let Some(family) = request.font_family.as_deref() {
        editor
            .set_font_family(family)
            .map_err(|err| ServerError::bad_request(err.to_string()))?;
    }
    if let Some(size) = request.font_size {
        editor.set_font_size(size);
    }
    if let Some(color) = request.color.as_deref() {
        editor
            .set_color(color)
            .map_err(|err| ServerError::bad_request(err.to_string()))?;
    }

    let fonts = state.fonts.clone();
    let (bytes, layout) = tokio::task::spawn_blocking(move || -> Result<_> {
        let bytes = editor.export(mime, &fonts)?;
        Ok((bytes, editor.layout().cloned()))
    })
    .await
    .map_err(|err| ServerError::internal(format!("render task failed: {}", err)))??;
    let layout = layout.ok_or_else(|| ServerError::internal("render produced no layout"))?;
    info!(
        "rendered {} bytes as {} ({} lines at {}px)",
        bytes.len(),
        mime,
        layout.lines.len(),
        layout.font_size
    );

    let upload = if request.upload {
        let receipt = state
            .uploader
            .upload(UploadRequest {
                bytes: bytes.clone(),
                mime: mime.to_string(),
                quote: Some(request.quote),
            })
            .await?;
        Some(receipt)
    } else {
        None
    };

    Ok(RenderResponse {
        image: ImageData {
            bytes,
            mime: mime.to_string(),
        }
        .to_data_url(),
        layout,
        upload,
    })
}
