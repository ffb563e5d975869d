// AI
//! 📊 progress.rs: "Are we there yet?" Every export, every table, forever.
//!
//! 🚀 Two jobs:
//! - `FetchProgress`: a spinner while a table is being paged through (rows, pages, rows/s, elapsed)
//! - `render_summary`: the comfy-table recap printed after a run
//!
//! ⚠️  Warning: Watching this spinner will not make the backend go faster.
//! Neither will refreshing it. We've tried. Science says no.

use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use indicatif::{ProgressBar, ProgressStyle};

use crate::supervisors::ExportOutcome;

// -- 📏 one mebibyte, not a megabyte, pedants. there's a difference and I will die on this hill.
const MIB: u64 = 1024 * 1024;

/// 📦 CSV payload size for the summary's `size` column.
fn format_bytes(bytes: u64) -> String {
    if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= 1024 {
        format!("{:.2} KiB", bytes as f64 / 1024.0)
    } else {
        // -- 🐛 raw bytes mode. small tables need love too.
        format!("{} bytes", bytes)
    }
}

/// 🔢 Row counts with thousands separators, for the spinner and the summary's `rows` column.
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let lead = digits.len() % 3;
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.char_indices() {
        if i > 0 && i % 3 == lead {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// ⏱️ How long a table has been paging. `MM:SS`, growing an hour field only for the big tables.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match (secs / 3600, secs % 3600 / 60, secs % 60) {
        (0, minutes, seconds) => format!("{:02}:{:02}", minutes, seconds),
        (hours, minutes, seconds) => format!("{:02}:{:02}:{:02}", hours, minutes, seconds),
    }
}

/// 🌀 Spinner for one table's pagination. Total size is unknown up front; the backend does not
/// greet us at the door with a row count, so there is no bar and no ETA. Just a spinner and vibes.
pub(crate) struct FetchProgress {
    table: String,
    total_rows: u64,
    total_pages: u64,
    spinner: ProgressBar,
    start_time: Instant,
}

// -- 🎭 custom Debug impl because ProgressBar is a diva and doesn't derive Debug
impl std::fmt::Debug for FetchProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchProgress")
            .field("table", &self.table)
            .field("total_rows", &self.total_rows)
            .field("total_pages", &self.total_pages)
            .finish()
    }
}

impl FetchProgress {
    pub(crate) fn new(table: &str) -> Self {
        let spinner = ProgressBar::new_spinner();
        // -- 🎨 hardcoded template; if it ever fails to parse we keep the default style and move on
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        let progress = Self {
            table: table.to_string(),
            total_rows: 0,
            total_pages: 0,
            spinner,
            start_time: Instant::now(),
        };
        progress.render();
        progress
    }

    /// 🔄 One more page landed.
    pub(crate) fn update(&mut self, rows_in_page: u64) {
        self.total_rows += rows_in_page;
        self.total_pages += 1;
        self.render();
        self.spinner.tick();
    }

    /// ✅ Done paging. Clear the spinner; the status log line takes it from here.
    pub(crate) fn finish(&self) {
        self.spinner.finish_and_clear();
    }

    pub(crate) fn total_rows(&self) -> u64 {
        self.total_rows
    }

    fn render(&self) {
        let elapsed = self.start_time.elapsed();
        let rows_per_sec = if elapsed.as_secs_f64() > 0.0 {
            self.total_rows as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        self.spinner.set_message(format!(
            "{}: {} rows in {} pages | {} rows/s | {} elapsed",
            self.table,
            format_number(self.total_rows),
            format_number(self.total_pages),
            format_number(rows_per_sec as u64),
            format_duration(elapsed)
        ));
    }
}

/// 🍽️ The post-run recap: one line per exported table.
pub fn render_summary(outcomes: &[ExportOutcome]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["table", "object", "rows", "size"]);

    for outcome in outcomes {
        table.add_row(vec![
            Cell::new(&outcome.table),
            Cell::new(&outcome.location),
            Cell::new(format_number(outcome.rows as u64)).set_alignment(CellAlignment::Right),
            Cell::new(format_bytes(outcome.bytes as u64)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}
