//! # Previously, on tbx...
//!
//! 🎬 The supervisor needed somebody to practice on. Somebody with no network,
//! no credentials, and no feelings about being asked for the same table twice.
//!
//! `in_mem` provides a test-only [`Source`] and [`Sink`]. The source serves tables out
//! of a `HashMap` and can be told to fail on a specific table. The sink keeps every object
//! behind an `Arc<Mutex<...>>` so tests can peek after the supervisor is done with it.
//!
//! ⚠️ This is NOT for production. It is `#[cfg(test)]` for a reason.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backends::{PageRequest, RequestFailure, Sink, Source, UploadReceipt};
use crate::common::Record;

/// 📚 Tables in RAM, served page by page, with an optional trapdoor.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemorySource {
    tables: HashMap<String, Vec<Record>>,
    /// 💀 Fetching this table answers with a 500. For fail-fast tests.
    failing_table: Option<String>,
    /// 📒 Every `(table, offset)` asked for, in order.
    pub(crate) requests: Arc<Mutex<Vec<(String, usize)>>>,
}

impl InMemorySource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_table(mut self, table: &str, rows: Vec<Record>) -> Self {
        self.tables.insert(table.to_string(), rows);
        self
    }

    pub(crate) fn failing_on(mut self, table: &str) -> Self {
        self.failing_table = Some(table.to_string());
        self
    }
}

#[async_trait]
impl Source for InMemorySource {
    async fn fetch_page(&mut self, request: PageRequest<'_>) -> Result<Vec<Record>> {
        self.requests
            .lock()
            .await
            .push((request.table.to_string(), request.offset));

        if self.failing_table.as_deref() == Some(request.table) {
            return Err(RequestFailure {
                method: reqwest::Method::GET,
                url: format!("memory://rest/v1/{}", request.table),
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                body: "the in-memory table tripped on purpose".to_string(),
            }
            .into());
        }

        // -- 📭 unknown tables are just empty, same as an empty real table
        let rows = self.tables.get(request.table).map(Vec::as_slice).unwrap_or(&[]);
        Ok(rows
            .iter()
            .skip(request.offset)
            .take(request.limit)
            .cloned()
            .collect())
    }
}

/// 📦 A bucket that fits in a HashMap. Upsert semantics: last write wins.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemorySink {
    pub(crate) objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    /// 📒 Every object path uploaded, in order, duplicates included.
    pub(crate) uploads: Arc<Mutex<Vec<String>>>,
}

impl InMemorySink {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Sink for InMemorySink {
    async fn upload(&mut self, object_path: &str, payload: Vec<u8>) -> Result<UploadReceipt> {
        self.objects
            .lock()
            .await
            .insert(object_path.to_string(), payload);
        self.uploads.lock().await.push(object_path.to_string());
        Ok(UploadReceipt {
            key: Some(self.location(object_path)),
        })
    }

    fn location(&self, object_path: &str) -> String {
        format!("memory/{}", object_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn the_one_where_the_second_upload_wins() {
        let mut the_sink = InMemorySink::new();
        the_sink
            .upload("datasets/bikes_20240115.csv", b"first".to_vec())
            .await
            .expect("💀 in-memory upload cannot fail");
        the_sink
            .upload("datasets/bikes_20240115.csv", b"second".to_vec())
            .await
            .expect("💀 in-memory upload cannot fail");

        let the_objects = the_sink.objects.lock().await;
        assert_eq!(the_objects.len(), 1);
        assert_eq!(the_objects["datasets/bikes_20240115.csv"], b"second".to_vec());
    }
}
