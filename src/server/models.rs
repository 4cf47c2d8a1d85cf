use serde::{Deserialize, Serialize};

use crate::fit::WrappedLayout;
use crate::upload::UploadReceipt;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct SignUploadQuery {
    pub(crate) context: Option<String>,
    pub(crate) public_id: Option<String>,
    pub(crate) exif: Option<String>,
    pub(crate) image_metadata: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct UploadPayload {
    pub(crate) image_data: Option<String>,
    pub(crate) quote: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct RenderRequest {
    pub(crate) quote: String,
    /// Background image as a data URL or bare base64.
    pub(crate) background: Option<String>,
    pub(crate) font_family: Option<String>,
    pub(crate) font_size: Option<u32>,
    pub(crate) color: Option<String>,
    /// Output mime or extension; defaults to `canvas.output_mime`.
    pub(crate) format: Option<String>,
    pub(crate) upload: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct RenderResponse {
    pub(crate) image: String,
    pub(crate) layout: WrappedLayout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) upload: Option<UploadReceipt>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
