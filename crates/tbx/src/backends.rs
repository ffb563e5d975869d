//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 Sources hand out pages of rows. Sinks swallow finished CSV objects.
//! And in between, we panic! (kidding, we use anyhow)
//!
//! 🧠 Knowledge graph:
//! - `Source`: one page of rows per call (`rest::RestSource` talks to `/rest/v1`)
//! - `Sink`: one object upload per call (`storage::StorageSink` talks to `/storage/v1`)
//! - `SourceBackend` / `SinkBackend`: enum dispatch, so the supervisor never learns
//!   whether it is talking to a real backend or the in-memory test doubles
//! - `RequestFailure`: the single error kind for "the server answered, and the answer was no"
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::common::Record;

pub(crate) mod connection;
pub(crate) mod rest;
pub(crate) mod storage;
#[cfg(test)]
pub(crate) mod in_mem;

pub use connection::BackendConfig;
pub use rest::RestSourceConfig;
pub use storage::{StorageSinkConfig, UploadReceipt};

// ===== Errors =====

/// 💀 The server answered, and the answer was not 2xx.
///
/// One kind for every HTTP failure on either API. A 401 from a rotated key and a 503
/// from a sleepy gateway look the same here; neither gets retried.
#[derive(Debug, thiserror::Error)]
#[error("💀 {method} {url} came back {status}. The response body read: '{body}'")]
pub struct RequestFailure {
    pub method: reqwest::Method,
    pub url: String,
    pub status: reqwest::StatusCode,
    pub body: String,
}

/// 🚦 Pass a 2xx response through; turn anything else into a `RequestFailure` carrying the body.
pub(crate) async fn ensure_success(
    method: reqwest::Method,
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, RequestFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    // -- 📜 the body is usually a JSON error object with a helpful 'message'. usually.
    let body = response.text().await.unwrap_or_default();
    Err(RequestFailure {
        method,
        url,
        status,
        body,
    })
}

// ===== Source Trait and Backend Enum =====

/// 📄 What to ask the source for: one window of one table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PageRequest<'a> {
    pub table: &'a str,
    pub limit: usize,
    pub offset: usize,
    /// 🔍 Extra query pairs, passed through verbatim (`status` → `eq.active`).
    pub filters: &'a BTreeMap<String, String>,
}

/// 🚰 A source that returns one page of rows per call.
///
/// # Contract 📜
/// - An empty `Vec` means the table is exhausted. Not an error. Just the end.
/// - `Err(...)` aborts the whole table. Nobody retries.
#[async_trait]
pub(crate) trait Source: std::fmt::Debug {
    async fn fetch_page(&mut self, request: PageRequest<'_>) -> Result<Vec<Record>>;
}

/// 🎭 The many faces of a Source.
#[derive(Debug)]
pub(crate) enum SourceBackend {
    Rest(rest::RestSource),
    #[cfg(test)]
    InMemory(in_mem::InMemorySource),
}

#[async_trait]
impl Source for SourceBackend {
    async fn fetch_page(&mut self, request: PageRequest<'_>) -> Result<Vec<Record>> {
        match self {
            SourceBackend::Rest(rest) => rest.fetch_page(request).await,
            #[cfg(test)]
            SourceBackend::InMemory(in_mem) => in_mem.fetch_page(request).await,
        }
    }
}

// ===== Sink Trait and Backend Enum =====

/// 🕳️ A sink that stores one finished object per call, overwriting whatever was there.
///
/// # Contract 📜
/// - `upload` is an upsert: create if absent, replace if present. No versions, no etags.
/// - `location` renders where an object path ends up, for status lines (`bucket/path`).
#[async_trait]
pub(crate) trait Sink: std::fmt::Debug {
    async fn upload(&mut self, object_path: &str, payload: Vec<u8>) -> Result<UploadReceipt>;
    fn location(&self, object_path: &str) -> String;
}

/// 🎭 The many faces of a Sink. Mirrors `SourceBackend`, because symmetry.
#[derive(Debug)]
pub(crate) enum SinkBackend {
    Storage(storage::StorageSink),
    #[cfg(test)]
    InMemory(in_mem::InMemorySink),
}

#[async_trait]
impl Sink for SinkBackend {
    async fn upload(&mut self, object_path: &str, payload: Vec<u8>) -> Result<UploadReceipt> {
        match self {
            SinkBackend::Storage(sink) => sink.upload(object_path, payload).await,
            #[cfg(test)]
            SinkBackend::InMemory(sink) => sink.upload(object_path, payload).await,
        }
    }

    fn location(&self, object_path: &str) -> String {
        match self {
            SinkBackend::Storage(sink) => sink.location(object_path),
            #[cfg(test)]
            SinkBackend::InMemory(sink) => sink.location(object_path),
        }
    }
}
