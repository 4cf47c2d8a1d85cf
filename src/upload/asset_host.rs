use anyhow::{Context, Result, anyhow};
use futures_util::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tracing::info;

use super::retry::{BASE_DELAY, MAX_RETRIES, is_retryable, retry_after, wait_with_backoff};
use super::sign::{self, Credentials, SignOptions, SignedUpload};
use super::{UploadReceipt, UploadRequest, UploadService};
use crate::data;
use crate::settings::AssetHostSettings;

/// Signs uploads and forwards them to the hosted image service.
#[derive(Debug, Clone)]
pub struct AssetHostUpload {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    api_base: String,
    delivery_base: String,
    context: BTreeMap<String, String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl AssetHostUpload {
    pub fn from_settings(settings: &AssetHostSettings) -> Result<Self> {
        let require = |value: &Option<String>, name: &str| {
            value
                .clone()
                .ok_or_else(|| anyhow!("asset host {} is not configured", name))
        };
        Ok(Self {
            cloud_name: require(&settings.cloud_name, "cloud_name")?,
            api_key: require(&settings.api_key, "api_key")?,
            api_secret: require(&settings.api_secret, "api_secret")?,
            api_base: settings.api_base.clone(),
            delivery_base: settings.delivery_base.clone(),
            context: settings.context.clone(),
            client: reqwest::Client::new(),
        })
    }

    fn credentials(&self) -> Credentials<'_> {
        Credentials {
            cloud_name: &self.cloud_name,
            api_key: &self.api_key,
            api_secret: &self.api_secret,
        }
    }

    /// Signs a client-driven upload; used by the signing endpoint.
    pub fn sign(&self, options: SignOptions) -> Result<SignedUpload> {
        sign::sign_upload(&self.credentials(), options, OffsetDateTime::now_utc())
    }

    fn endpoint(&self) -> String {
        format!("{}/v1_1/{}/image/upload", self.api_base, self.cloud_name)
    }

    fn form(&self, signed: &SignedUpload, request: &UploadRequest) -> Result<Form> {
        let ext = data::extension_from_mime(&request.mime).unwrap_or("jpeg");
        let part = Part::bytes(request.bytes.clone())
            .file_name(format!("{}.{}", signed.public_id, ext))
            .mime_str(&request.mime)
            .with_context(|| format!("invalid upload mime '{}'", request.mime))?;
        let mut form = Form::new().part("file", part);
        for (name, value) in signed.form_fields() {
            form = form.text(name, value);
        }
        Ok(form)
    }

    async fn send(&self, request: UploadRequest) -> Result<UploadReceipt> {
        let options = SignOptions {
            context: sign::build_context(request.quote.as_deref(), &self.context),
            public_id: None,
            exif: Some("true".to_string()),
            image_metadata: Some("true".to_string()),
        };
        let signed = self.sign(options)?;
        let endpoint = self.endpoint();
        let mut delay = BASE_DELAY;
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&endpoint)
                .multipart(self.form(&signed, &request)?)
                .send()
                .await
                .with_context(|| "asset host upload request failed")?;
            let status = response.status();
            if status.is_success() {
                let body: UploadResponse = response
                    .json()
                    .await
                    .with_context(|| "failed to parse asset host response")?;
                return receipt_from_response(body, &signed.folder);
            }
            if is_retryable(status) && attempt < MAX_RETRIES {
                attempt += 1;
                let wait = retry_after(response.headers());
                delay = wait_with_backoff(attempt, delay, wait).await;
                continue;
            }
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(anyhow!(
                "asset host upload failed ({}): {}",
                status,
                message.trim()
            ));
        }
    }
}

fn receipt_from_response(body: UploadResponse, folder: &str) -> Result<UploadReceipt> {
    let url = body
        .secure_url
        .or(body.url)
        .ok_or_else(|| anyhow!("asset host response has no url"))?;
    let (bucket_id, image_id) = match body.public_id.rsplit_once('/') {
        Some((bucket, image)) => (bucket.to_string(), image.to_string()),
        None => (folder.to_string(), body.public_id),
    };
    info!("uploaded to asset host: {}", url);
    Ok(UploadReceipt {
        url,
        bucket_id,
        image_id,
    })
}

impl UploadService for AssetHostUpload {
    fn upload(&self, request: UploadRequest) -> BoxFuture<'_, Result<UploadReceipt>> {
        Box::pin(self.send(request))
    }

    fn public_url(&self, bucket_id: &str, image_id: &str) -> String {
        format!(
            "{}/{}/image/upload/{}/{}",
            self.delivery_base, self.cloud_name, bucket_id, image_id
        )
    }
}
