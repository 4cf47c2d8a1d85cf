//! Upload Service: stores an exported image and hands back where it lives.
//!
//! Exactly one backend is active, chosen by `upload.backend` in settings.

mod asset_host;
mod local;
mod retry;
pub mod sign;

pub use asset_host::AssetHostUpload;
pub use local::LocalUpload;

use anyhow::Result;
use futures_util::future::BoxFuture;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::settings::{Settings, UploadBackend};

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    pub mime: String,
    /// The quote text, attached as alt/caption metadata where supported.
    pub quote: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub url: String,
    #[serde(rename = "bucket")]
    pub bucket_id: String,
    pub image_id: String,
}

pub trait UploadService: Send + Sync {
    fn upload(&self, request: UploadRequest) -> BoxFuture<'_, Result<UploadReceipt>>;

    /// Where a previously uploaded image can be viewed.
    fn public_url(&self, bucket_id: &str, image_id: &str) -> String;

    /// Where a stored image lives on disk, for backends that serve their
    /// own files. Remote backends return `None`.
    fn local_path(&self, _bucket_id: &str, _image_id: &str) -> Option<PathBuf> {
        None
    }
}

pub fn build_upload_service(settings: &Settings) -> Result<Arc<dyn UploadService>> {
    Ok(match settings.upload_backend {
        UploadBackend::Local => Arc::new(LocalUpload::new(settings.public_dir.clone())),
        UploadBackend::AssetHost => Arc::new(AssetHostUpload::from_settings(&settings.asset_host)?),
    })
}

/// Bucket/image slugs are single path segments.
pub(crate) fn is_safe_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}
