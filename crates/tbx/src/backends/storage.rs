//! 🪣 Storage sink: `POST /storage/v1/object/{bucket}/{path}` with `x-upsert: true`.
//!
//! The last stop. The CSV bytes go in; an object comes out the other side, replacing
//! whatever lived at that path before. No versions. No "are you sure?". Upsert.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderName};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::backends::connection::BackendConnection;
use crate::backends::{Sink, ensure_success};

/// 🔧 Where the CSVs go and how long we'll wait for them to get there.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSinkConfig {
    /// 🪣 Bucket name. Defaults to `open-data`.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// 📁 Prefix inside the bucket, fed into every target's path template as `{base_path}`.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// ⏱️ Per-upload timeout. Bigger than the fetch timeout; payloads are whole tables.
    #[serde(default = "default_upload_timeout_secs")]
    pub timeout_secs: u64,
    /// 🏷️ Content-Type sent with every object.
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_bucket() -> String {
    "open-data".to_string()
}

fn default_base_path() -> String {
    "datasets".to_string()
}

fn default_upload_timeout_secs() -> u64 {
    300
}

fn default_content_type() -> String {
    "text/csv; charset=utf-8".to_string()
}

impl Default for StorageSinkConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            base_path: default_base_path(),
            timeout_secs: default_upload_timeout_secs(),
            content_type: default_content_type(),
        }
    }
}

/// 🧾 What the storage API said after accepting an object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UploadReceipt {
    /// 🗝️ Stored key, usually `{bucket}/{path}`. `None` if the acknowledgment skipped it.
    #[serde(default, rename = "Key", alias = "key")]
    pub key: Option<String>,
}

/// 🪣 Uploads finished CSV objects. I/O only, no buffering.
#[derive(Debug)]
pub(crate) struct StorageSink {
    connection: BackendConnection,
    config: StorageSinkConfig,
}

impl StorageSink {
    pub(crate) fn new(connection: BackendConnection, config: StorageSinkConfig) -> Self {
        Self { connection, config }
    }
}

#[async_trait]
impl Sink for StorageSink {
    async fn upload(&mut self, object_path: &str, payload: Vec<u8>) -> Result<UploadReceipt> {
        let url = self
            .connection
            .endpoint(&["storage", "v1", "object", &self.config.bucket, object_path])?;
        debug!(
            "📡 uploading {} bytes to {}",
            payload.len(),
            self.location(object_path)
        );

        let response = self
            .connection
            .client()
            .post(url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .header(CONTENT_TYPE, &self.config.content_type)
            // -- ⚠️ without x-upsert the second run of the day gets a 409 and a lecture
            .header(HeaderName::from_static("x-upsert"), "true")
            .body(payload)
            .send()
            .await
            .context(format!(
                "💀 The upload of '{}' never reached the storage API. The bytes were ready. The network was not.",
                self.location(object_path)
            ))?;

        let response = ensure_success(Method::POST, response).await.context(format!(
            "💀 The storage API refused '{}'.",
            self.location(object_path)
        ))?;

        let body = response.bytes().await.context(format!(
            "💀 The acknowledgment for '{}' evaporated mid-read.",
            self.location(object_path)
        ))?;
        trace!("🧾 storage acknowledgment: {} bytes", body.len());

        // -- 🤷 the object is stored at this point; a weird acknowledgment is not worth failing the run over
        let receipt = match serde_json::from_slice::<UploadReceipt>(&body) {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(
                    "⚠️ upload of '{}' succeeded but the acknowledgment was not the JSON we expected: {}",
                    self.location(object_path),
                    err
                );
                UploadReceipt::default()
            }
        };
        Ok(receipt)
    }

    fn location(&self, object_path: &str) -> String {
        format!("{}/{}", self.config.bucket, object_path)
    }
}
