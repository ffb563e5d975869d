//! 📦 tbx: table export. Every configured table, paged out of the REST API,
//! turned into a dated CSV, and dropped into the storage bucket over yesterday's copy.
//!
//! 🧠 Knowledge graph:
//! - `app_config`: figment layers → `AppConfig`
//! - `backends`: the REST source and the storage sink, plus the shared HTTP connection
//! - `fetcher`: pagination until the empty page
//! - `composers`: rows → CSV bytes
//! - `supervisors`: the sequential, fail-fast export loop
//! - `progress`: spinner while fetching, summary table when done

pub mod app_config;
mod backends;
mod common;
mod composers;
mod fetcher;
mod progress;
mod run_date;
mod supervisors;

use anyhow::{Context, Result};
use tracing::info;

use crate::app_config::AppConfig;
use crate::backends::connection::BackendConnection;
use crate::backends::rest::RestSource;
use crate::backends::storage::StorageSink;
use crate::backends::{SinkBackend, SourceBackend};
use crate::supervisors::Supervisor;

pub use crate::backends::{
    BackendConfig, RequestFailure, RestSourceConfig, StorageSinkConfig, UploadReceipt,
};
pub use crate::common::{Cell, Dataset, Record};
pub use crate::progress::render_summary;
pub use crate::run_date::{DEFAULT_PATH_TEMPLATE, RunDate, render_object_path};
pub use crate::supervisors::{ExportOutcome, ExportTarget, RunReport, default_targets};

/// 🚀 Export every configured table, stamped with today's date in the configured zone.
pub async fn run(app_config: AppConfig) -> Result<RunReport> {
    let tz = app_config.timezone()?;
    // -- 📅 one stamp for the whole run, even if it crosses midnight
    let run_date = RunDate::today_in(tz);
    run_on(app_config, run_date).await
}

/// 🔧 `run`, with the date pinned by the caller.
pub(crate) async fn run_on(app_config: AppConfig, run_date: RunDate) -> Result<RunReport> {
    let connection = BackendConnection::new(&app_config.backend)
        .context("💀 Could not set up the connection to the backend.")?;

    info!(
        "🔧 run_date={} tz={} bucket={} base_path={} page_size={} rental_date_col={} targets={}",
        run_date,
        app_config.runtime.timezone,
        app_config.sink_config.bucket,
        app_config.sink_config.base_path,
        app_config.source_config.page_size,
        app_config.source_config.rental_date_col,
        app_config.runtime.targets.len()
    );

    let source = SourceBackend::Rest(RestSource::new(
        connection.clone(),
        &app_config.source_config,
    ));
    let base_path = app_config.sink_config.base_path.clone();
    let sink = SinkBackend::Storage(StorageSink::new(connection, app_config.sink_config));

    let report = Supervisor::new(
        source,
        sink,
        app_config.runtime.targets,
        app_config.source_config.page_size,
        base_path,
        run_date,
    )
    .run()
    .await?;

    info!(
        "🏁 exported {} table(s), {} row(s) total",
        report.outcomes.len(),
        report.total_rows()
    );
    Ok(report)
}
