use anyhow::{Context, Result};
use futures_util::future::BoxFuture;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use time::{OffsetDateTime, format_description};
use tracing::info;

use super::sign::unix_millis;
use super::{UploadReceipt, UploadRequest, UploadService, is_safe_segment};
use crate::data;

pub const URL_PREFIX: &str = "/uploaded";
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Writes uploads to `<root>/uploaded/<DDMMYYYY>/upload_<millis>.<ext>`.
#[derive(Debug, Clone)]
pub struct LocalUpload {
    root: PathBuf,
}

impl LocalUpload {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.root.join("uploaded")
    }

    pub(crate) fn store(&self, request: &UploadRequest, now: OffsetDateTime) -> Result<UploadReceipt> {
        let bucket = day_bucket(now)?;
        let dir = self.upload_dir().join(&bucket);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create upload dir: {}", dir.display()))?;
        let ext = data::extension_from_mime(&request.mime).unwrap_or("jpeg");
        let stem = format!("upload_{}", unix_millis(now));

        let mut file = tempfile::Builder::new()
            .prefix(".upload-")
            .tempfile_in(&dir)
            .with_context(|| "failed to create upload temp file")?;
        file.write_all(&request.bytes)
            .with_context(|| "failed to write upload")?;

        let mut attempt = 0;
        let file_name = loop {
            let file_name = if attempt == 0 {
                format!("{}.{}", stem, ext)
            } else {
                format!("{}_{}.{}", stem, attempt, ext)
            };
            let path = dir.join(&file_name);
            match file.persist_noclobber(&path) {
                Ok(_) => {
                    info!("stored upload at {}", path.display());
                    break file_name;
                }
                Err(err)
                    if err.error.kind() == ErrorKind::AlreadyExists
                        && attempt < MAX_NAME_ATTEMPTS =>
                {
                    file = err.file;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(err.error)
                        .with_context(|| format!("failed to persist upload: {}", path.display()));
                }
            }
        };

        Ok(UploadReceipt {
            url: format!("{}/{}/{}", URL_PREFIX, bucket, file_name),
            bucket_id: bucket,
            image_id: file_name,
        })
    }
}

impl UploadService for LocalUpload {
    fn upload(&self, request: UploadRequest) -> BoxFuture<'_, Result<UploadReceipt>> {
        Box::pin(async move {
            let this = self.clone();
            tokio::task::spawn_blocking(move || this.store(&request, OffsetDateTime::now_utc()))
                .await
                .with_context(|| "upload task failed")?
        })
    }

    fn public_url(&self, bucket_id: &str, image_id: &str) -> String {
        format!("{}/{}/{}", URL_PREFIX, bucket_id, image_id)
    }

    fn local_path(&self, bucket_id: &str, image_id: &str) -> Option<PathBuf> {
        if !is_safe_segment(bucket_id) || !is_safe_segment(image_id) {
            return None;
        }
        Some(self.upload_dir().join(bucket_id).join(image_id))
    }
}

/// `DDMMYYYY` directory for uploads made on `now`'s date.
pub fn day_bucket(now: OffsetDateTime) -> Result<String> {
    let format = format_description::parse("[day][month][year]")
        .with_context(|| "invalid bucket format")?;
    now.format(&format)
        .with_context(|| "failed to format upload bucket")
}
