//! 🔌 Backend connection: one HTTP client, one service key, two APIs.
//!
//! The REST API and the storage API live under the same base URL and want the same
//! credentials, so they share one `reqwest::Client` whose default headers carry
//! `apikey` and `Authorization: Bearer`. Built once at startup. Read-only after that.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

/// 📡 Where the backend lives and how we prove we're allowed in.
#[derive(Clone, Deserialize)]
pub struct BackendConfig {
    /// 📡 Project base URL, e.g. `https://abcd.supabase.co`. Trailing slash optional.
    pub url: String,
    /// 🔒 Service-role key. Sent as both `apikey` and bearer token.
    pub service_role_key: String,
}

// 🔒 manual Debug so the service key never ends up in a log line at 3am
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("service_role_key", &"<redacted>")
            .finish()
    }
}

/// 🔗 The shared client plus the parsed base URL.
#[derive(Debug, Clone)]
pub(crate) struct BackendConnection {
    client: reqwest::Client,
    base_url: Url,
}

impl BackendConnection {
    /// 🚀 Build the client with auth baked into the default headers.
    ///
    /// 10 second connect timeout. Per-request timeouts are set by the source and sink,
    /// because a 300 second upload and a 120 second page fetch are different moods.
    pub(crate) fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(config.url.trim_end_matches('/')).context(format!(
            "💀 The backend URL '{}' is not a URL. It might be a vibe. It is not a URL.",
            config.url
        ))?;

        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", config.service_role_key))
            .context("💀 The service key contains characters HTTP headers refuse to carry.")?;
        auth_value.set_sensitive(true);
        let mut apikey_value = HeaderValue::from_str(&config.service_role_key)
            .context("💀 The service key contains characters HTTP headers refuse to carry.")?;
        apikey_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("apikey"), apikey_value);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()
            .context("💀 The HTTP client refused to be born. Probably the TLS stack. It's always the TLS stack.")?;

        Ok(Self { client, base_url })
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// 🗺️ `base_url` + path segments, each segment percent-encoded on its own.
    ///
    /// Segments may contain `/` (object paths do); those are split so the slash stays a
    /// path separator instead of becoming `%2F`.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                anyhow::anyhow!(
                    "💀 The backend URL '{}' cannot carry a path. Did someone configure a mailto: link?",
                    self.base_url
                )
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.extend(segment.split('/').filter(|part| !part.is_empty()));
            }
        }
        Ok(url)
    }
}
