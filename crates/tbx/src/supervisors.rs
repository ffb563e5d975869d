//! 🎬 *[camera pans across a list of six table names]*
//! 🎬 "In a world where every table must become a CSV..."
//! 🎬 "One supervisor dared to export them all. In order. One at a time."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor: part middle manager, part checklist. It walks the export targets
//! top to bottom: fetch every row, compose the CSV, upload it over whatever was there.
//!
//! 🧠 Knowledge graph:
//! - `ExportTarget`: table + destination path template + optional filters
//! - `Supervisor::run`: Fetcher → CsvComposer → Sink, per target, strictly sequential
//! - Fail-fast: the first error ends the run. Objects already uploaded stay uploaded.
//! - `RunReport`: what actually made it, for the summary table

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::backends::{Sink, SinkBackend, SourceBackend};
use crate::composers::CsvComposer;
use crate::fetcher::fetch_all_rows;
use crate::run_date::{DEFAULT_PATH_TEMPLATE, RunDate, render_object_path};

/// 🎯 One table to export and where its CSV goes.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ExportTarget {
    pub table: String,
    /// 🗝️ Destination template; `{base_path}`, `{table}`, `{run_date}` get filled in.
    #[serde(default = "default_path_template")]
    pub path: String,
    /// 🔍 Extra REST query pairs, e.g. `status = "eq.active"`. Empty for a full snapshot.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

fn default_path_template() -> String {
    DEFAULT_PATH_TEMPLATE.to_string()
}

impl ExportTarget {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            path: default_path_template(),
            filters: BTreeMap::new(),
        }
    }
}

/// 📋 The tables exported when the config doesn't say otherwise, in export order.
pub fn default_targets() -> Vec<ExportTarget> {
    ["users", "weekly_sales", "hubs", "stations", "bikes", "rental_logs"]
        .into_iter()
        .map(ExportTarget::new)
        .collect()
}

/// ✅ One table that made it all the way to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub table: String,
    pub object_path: String,
    /// 🪣 `bucket/path`, as the sink describes it
    pub location: String,
    pub rows: usize,
    pub bytes: usize,
    /// 🧾 Key the storage API reported back, if it reported one
    pub stored_key: Option<String>,
}

/// 📊 Everything a finished run has to show for itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_date: RunDate,
    pub outcomes: Vec<ExportOutcome>,
}

impl RunReport {
    pub fn total_rows(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.rows).sum()
    }
}

/// 📦 The Supervisor: holds the backends and the checklist, and does the checklist.
#[derive(Debug)]
pub(crate) struct Supervisor {
    source: SourceBackend,
    sink: SinkBackend,
    composer: CsvComposer,
    targets: Vec<ExportTarget>,
    page_size: usize,
    base_path: String,
    run_date: RunDate,
}

impl Supervisor {
    pub(crate) fn new(
        source: SourceBackend,
        sink: SinkBackend,
        targets: Vec<ExportTarget>,
        page_size: usize,
        base_path: String,
        run_date: RunDate,
    ) -> Self {
        Self {
            source,
            sink,
            composer: CsvComposer,
            targets,
            page_size,
            base_path,
            run_date,
        }
    }

    /// 🚀 Export every target, in order, stopping at the first failure.
    pub(crate) async fn run(mut self) -> Result<RunReport> {
        let targets = std::mem::take(&mut self.targets);
        let mut outcomes = Vec::with_capacity(targets.len());

        for target in &targets {
            let outcome = self.export_overwrite(target).await.context(format!(
                "💀 Export of table '{}' failed. {} target(s) after it were not attempted.",
                target.table,
                targets.len() - outcomes.len() - 1
            ))?;
            outcomes.push(outcome);
        }

        Ok(RunReport {
            run_date: self.run_date,
            outcomes,
        })
    }

    /// 🔄 Fetch → compose → upload for one table.
    async fn export_overwrite(&mut self, target: &ExportTarget) -> Result<ExportOutcome> {
        let object_path =
            render_object_path(&target.path, &self.base_path, &target.table, &self.run_date);
        let location = self.sink.location(&object_path);
        info!("📤 [EXPORT overwrite] {} -> {}", target.table, location);

        let rows = fetch_all_rows(&mut self.source, &target.table, self.page_size, &target.filters)
            .await?;
        let payload = self
            .composer
            .compose(&rows)
            .context(format!("💀 Rows of '{}' could not be composed into CSV.", target.table))?;
        let bytes = payload.len();
        let receipt = self.sink.upload(&object_path, payload).await?;

        info!("✅ [OK] rows={} uploaded", rows.len());
        Ok(ExportOutcome {
            table: target.table.clone(),
            object_path,
            location,
            rows: rows.len(),
            bytes,
            stored_key: receipt.key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::RequestFailure;
    use crate::backends::in_mem::{InMemorySink, InMemorySource};
    use crate::common::Record;
    use chrono::NaiveDate;

    fn the_run_date() -> RunDate {
        RunDate::from_date(NaiveDate::from_ymd_opt(2024, 1, 15).expect("💀 a real date"))
    }

    fn the_rows(json: &str) -> Vec<Record> {
        serde_json::from_str(json).expect("💀 fixture rows")
    }

    fn the_supervisor(
        source: InMemorySource,
        sink: InMemorySink,
        targets: Vec<ExportTarget>,
    ) -> Supervisor {
        Supervisor::new(
            SourceBackend::InMemory(source),
            SinkBackend::InMemory(sink),
            targets,
            2,
            "datasets".to_string(),
            the_run_date(),
        )
    }

    #[test]
    fn the_one_where_the_default_lineup_is_the_usual_six() {
        let the_tables: Vec<String> = default_targets().into_iter().map(|t| t.table).collect();
        assert_eq!(
            the_tables,
            vec!["users", "weekly_sales", "hubs", "stations", "bikes", "rental_logs"]
        );
        assert!(default_targets().iter().all(|t| t.filters.is_empty()));
    }

    #[tokio::test]
    async fn the_one_where_every_table_lands_as_a_dated_csv() {
        let the_source = InMemorySource::new()
            .with_table("users", the_rows(r#"[{"id":1,"name":"a"},{"id":2,"name":"b"},{"id":3,"name":"c"}]"#))
            .with_table("bikes", the_rows(r#"[{"serial":"X1"}]"#));
        let the_sink = InMemorySink::new();
        let the_objects = the_sink.objects.clone();

        let the_report = the_supervisor(
            the_source,
            the_sink,
            vec![ExportTarget::new("users"), ExportTarget::new("bikes"), ExportTarget::new("hubs")],
        )
        .run()
        .await
        .expect("💀 in-memory run should succeed");

        assert_eq!(the_report.outcomes.len(), 3);
        assert_eq!(the_report.total_rows(), 4);
        assert_eq!(the_report.outcomes[0].object_path, "datasets/users_20240115.csv");
        assert_eq!(the_report.outcomes[0].location, "memory/datasets/users_20240115.csv");

        let the_objects = the_objects.lock().await;
        assert_eq!(
            the_objects["datasets/users_20240115.csv"],
            b"id,name\r\n1,a\r\n2,b\r\n3,c\r\n".to_vec()
        );
        assert_eq!(the_objects["datasets/bikes_20240115.csv"], b"serial\r\nX1\r\n".to_vec());
        // -- 🕳️ an empty table still gets an object, it's just an empty one
        assert!(the_objects["datasets/hubs_20240115.csv"].is_empty());
    }

    #[tokio::test]
    async fn the_one_where_t2_falls_over_and_t3_never_gets_a_turn() {
        let the_source = InMemorySource::new()
            .with_table("t1", the_rows(r#"[{"id":1}]"#))
            .with_table("t3", the_rows(r#"[{"id":3}]"#))
            .failing_on("t2");
        let the_requests = the_source.requests.clone();
        let the_sink = InMemorySink::new();
        let the_uploads = the_sink.uploads.clone();

        let the_error = the_supervisor(
            the_source,
            the_sink,
            vec![ExportTarget::new("t1"), ExportTarget::new("t2"), ExportTarget::new("t3")],
        )
        .run()
        .await
        .expect_err("💀 t2 is rigged to fail");

        let the_failure = the_error
            .downcast_ref::<RequestFailure>()
            .expect("💀 the surfaced error should be the request failure");
        assert_eq!(the_failure.status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(the_error.to_string().contains("t2"));

        let the_asked_tables: Vec<String> = the_requests
            .lock()
            .await
            .iter()
            .map(|(table, _)| table.clone())
            .collect();
        assert!(!the_asked_tables.contains(&"t3".to_string()), "t3 must never be fetched");
        assert_eq!(*the_uploads.lock().await, vec!["datasets/t1_20240115.csv".to_string()]);
    }

    #[tokio::test]
    async fn the_one_where_a_custom_template_and_filters_are_honored() {
        let the_source = InMemorySource::new().with_table("rental_logs", the_rows(r#"[{"id":9}]"#));
        let the_sink = InMemorySink::new();
        let the_uploads = the_sink.uploads.clone();

        let the_target = ExportTarget {
            table: "rental_logs".to_string(),
            path: "{base_path}/{run_date}/{table}.csv".to_string(),
            filters: BTreeMap::from([("status".to_string(), "eq.closed".to_string())]),
        };
        the_supervisor(the_source, the_sink, vec![the_target])
            .run()
            .await
            .expect("💀 run should succeed");

        assert_eq!(
            *the_uploads.lock().await,
            vec!["datasets/20240115/rental_logs.csv".to_string()]
        );
    }
}
