//! 📡 REST source: pages of rows from `GET /rest/v1/{table}`.
//!
//! 🎬 *[a client asks for 2000 rows at offset 0. the server obliges.]*
//! *[the client asks again at offset 2000. and again. and again.]*
//! *[finally: `[]`. the server has nothing left to give. neither do we.]*
//!
//! One page per `fetch_page` call; the pagination loop lives in `fetcher`.
//! The query is always `select=*&limit=N&offset=M`, plus whatever filters the target carries.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::backends::connection::BackendConnection;
use crate::backends::{PageRequest, Source, ensure_success};
use crate::common::Record;

/// 🔧 Knobs for reading tables.
#[derive(Debug, Deserialize, Clone)]
pub struct RestSourceConfig {
    /// 📦 Rows per page. Must be at least 1, or the offset never moves and neither do we.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// ⏱️ Per-page request timeout. Generous, because some tables are chonky.
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    /// 📅 Column name for a rental-date filter. Loaded and logged; no export filters on it yet.
    #[serde(default = "default_rental_date_col")]
    pub rental_date_col: String,
}

fn default_page_size() -> usize {
    2000
}

fn default_fetch_timeout_secs() -> u64 {
    120
}

fn default_rental_date_col() -> String {
    "rental_start_date".to_string()
}

impl Default for RestSourceConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            timeout_secs: default_fetch_timeout_secs(),
            rental_date_col: default_rental_date_col(),
        }
    }
}

/// 📡 Reads pages from the backend's REST interface. Stateless between calls; the offset
/// arrives with every request.
#[derive(Debug)]
pub(crate) struct RestSource {
    connection: BackendConnection,
    timeout: Duration,
}

impl RestSource {
    pub(crate) fn new(connection: BackendConnection, config: &RestSourceConfig) -> Self {
        Self {
            connection,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// 🔍 `select`/`limit`/`offset`, then the filters. A filter that reuses one of those
/// names replaces it in place; each key appears once.
fn query_pairs<'a>(request: &PageRequest<'a>) -> Vec<(&'a str, String)> {
    let mut pairs = vec![
        ("select", "*".to_string()),
        ("limit", request.limit.to_string()),
        ("offset", request.offset.to_string()),
    ];
    for (key, value) in request.filters {
        match pairs.iter_mut().find(|(name, _)| *name == key.as_str()) {
            Some((_, existing)) => *existing = value.clone(),
            None => pairs.push((key.as_str(), value.clone())),
        }
    }
    pairs
}

#[async_trait]
impl Source for RestSource {
    /// 📄 `GET {base}/rest/v1/{table}?select=*&limit=..&offset=..[&filters]`
    async fn fetch_page(&mut self, request: PageRequest<'_>) -> Result<Vec<Record>> {
        let mut url = self.connection.endpoint(&["rest", "v1", request.table])?;
        url.query_pairs_mut()
            .extend_pairs(query_pairs(&request));

        debug!(
            "📡 fetching {} rows of '{}' starting at offset {}",
            request.limit, request.table, request.offset
        );

        let response = self
            .connection
            .client()
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .context(format!(
                "💀 The page request for table '{}' at offset {} never got an answer. \
                 Check connectivity, the base URL, and whether the backend is awake.",
                request.table, request.offset
            ))?;

        let response = ensure_success(Method::GET, response).await.context(format!(
            "💀 The backend refused to hand over table '{}' (offset {}).",
            request.table, request.offset
        ))?;

        let body = response.bytes().await.context(format!(
            "💀 The response body for table '{}' got lost somewhere between the socket and us.",
            request.table
        ))?;
        trace!("📦 {} bytes of JSON arrived for '{}'", body.len(), request.table);

        let rows: Vec<Record> = serde_json::from_slice(&body).context(format!(
            "💀 Table '{}' answered with something that is not a JSON array of row objects.",
            request.table
        ))?;
        Ok(rows)
    }
}
