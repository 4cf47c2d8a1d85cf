use std::sync::Arc;

use crate::font::FontBook;
use crate::settings::Settings;
use crate::upload::{AssetHostUpload, UploadService};

pub(crate) struct ServerState {
    pub(crate) settings: Settings,
    pub(crate) uploader: Arc<dyn UploadService>,
    /// Present only when asset host credentials are configured.
    pub(crate) signer: Option<AssetHostUpload>,
    pub(crate) fonts: Arc<FontBook>,
}
