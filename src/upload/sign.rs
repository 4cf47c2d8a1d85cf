//! Signed upload parameters for the asset host.
//!
//! The signature is the hex SHA-1 of every non-empty parameter as `key=value`,
//! sorted by key and joined with `&`, immediately followed by the API secret.

use anyhow::{Context, Result};
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use time::{OffsetDateTime, format_description};

#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    pub context: Option<String>,
    pub public_id: Option<String>,
    pub exif: Option<String>,
    pub image_metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignedUpload {
    pub signature: String,
    pub timestamp: i64,
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "cloudName")]
    pub cloud_name: String,
    pub folder: String,
    pub context: Option<String>,
    pub public_id: String,
    pub exif: Option<String>,
    pub image_metadata: Option<String>,
}

impl SignedUpload {
    /// The signed parameters, as they must be sent alongside the file.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("api_key", self.api_key.clone()),
            ("timestamp", self.timestamp.to_string()),
            ("signature", self.signature.clone()),
            ("folder", self.folder.clone()),
            ("public_id", self.public_id.clone()),
        ];
        if let Some(context) = &self.context {
            fields.push(("context", context.clone()));
        }
        if let Some(exif) = &self.exif {
            fields.push(("exif", exif.clone()));
        }
        if let Some(metadata) = &self.image_metadata {
            fields.push(("image_metadata", metadata.clone()));
        }
        fields
    }
}

pub struct Credentials<'a> {
    pub cloud_name: &'a str,
    pub api_key: &'a str,
    pub api_secret: &'a str,
}

pub fn sign_upload(
    credentials: &Credentials<'_>,
    options: SignOptions,
    now: OffsetDateTime,
) -> Result<SignedUpload> {
    let timestamp = now.unix_timestamp();
    let folder = month_folder(now)?;
    let public_id = options
        .public_id
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default_public_id(now));
    let context = options.context.filter(|value| !value.is_empty());
    let exif = options.exif.filter(|value| !value.is_empty());
    let image_metadata = options.image_metadata.filter(|value| !value.is_empty());

    let mut params = BTreeMap::new();
    params.insert("timestamp", timestamp.to_string());
    params.insert("folder", folder.clone());
    params.insert("public_id", public_id.clone());
    if let Some(value) = &context {
        params.insert("context", value.clone());
    }
    if let Some(value) = &exif {
        params.insert("exif", value.clone());
    }
    if let Some(value) = &image_metadata {
        params.insert("image_metadata", value.clone());
    }

    Ok(SignedUpload {
        signature: api_sign_request(&params, credentials.api_secret),
        timestamp,
        api_key: credentials.api_key.to_string(),
        cloud_name: credentials.cloud_name.to_string(),
        folder,
        context,
        public_id,
        exif,
        image_metadata,
    })
}

pub fn api_sign_request(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `MMYYYY` folder the upload is filed under.
pub fn month_folder(now: OffsetDateTime) -> Result<String> {
    let format = format_description::parse("[month][year]")
        .with_context(|| "invalid folder format")?;
    now.format(&format)
        .with_context(|| "failed to format upload folder")
}

pub fn default_public_id(now: OffsetDateTime) -> String {
    format!("img_{}", unix_millis(now))
}

pub(crate) fn unix_millis(now: OffsetDateTime) -> i128 {
    now.unix_timestamp_nanos() / 1_000_000
}

/// `alt=<quote>|caption=<quote>` plus extra entries, escaping `|` and `=`.
pub fn build_context(quote: Option<&str>, extra: &BTreeMap<String, String>) -> Option<String> {
    let mut entries = Vec::new();
    if let Some(quote) = quote.map(str::trim).filter(|quote| !quote.is_empty()) {
        let escaped = escape_context_value(quote);
        entries.push(format!("alt={}", escaped));
        entries.push(format!("caption={}", escaped));
    }
    for (key, value) in extra {
        entries.push(format!(
            "{}={}",
            escape_context_value(key),
            escape_context_value(value)
        ));
    }
    if entries.is_empty() {
        None
    } else {
        Some(entries.join("|"))
    }
}

fn escape_context_value(value: &str) -> String {
    value.replace('|', "\\|").replace('=', "\\=")
}
