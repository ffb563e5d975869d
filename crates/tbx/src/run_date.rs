//! 🕰️ Run date: "what day is it?" answered exactly once per run, in one timezone.
//!
//! The stamp is computed when the run starts and reused for every target, so an
//! export that straddles midnight still files all its CSVs under the same date.
//!
//! 🧠 Knowledge graph:
//! - `RunDate::today_in(tz)`: wall-clock date in the configured zone (default Asia/Seoul)
//! - `RunDate::stamp()`: `YYYYMMDD`
//! - `render_object_path`: fills `{base_path}`, `{table}`, `{run_date}` into a target's template

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

/// 🧾 The template every target uses unless it brings its own.
pub const DEFAULT_PATH_TEMPLATE: &str = "{base_path}/{table}_{run_date}.csv";

/// 📅 The date stamp embedded in destination object paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDate(NaiveDate);

impl RunDate {
    /// 🌏 Today's date as seen from `tz`. Not UTC's today. Not the laptop's today. `tz`'s today.
    pub fn today_in(tz: Tz) -> Self {
        Self(Utc::now().with_timezone(&tz).date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// 🔢 `YYYYMMDD`, the format the object keys have always used.
    pub fn stamp(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

impl std::fmt::Display for RunDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stamp())
    }
}

/// 🗝️ Fill a destination template.
///
/// A trailing `/` on the base path is trimmed. An empty base path drops the
/// leading separator too, so `{base_path}/x.csv` becomes `x.csv` rather than `/x.csv`.
pub fn render_object_path(template: &str, base_path: &str, table: &str, run_date: &RunDate) -> String {
    let base_path = base_path.trim_end_matches('/');
    let rendered = template
        .replace("{base_path}", base_path)
        .replace("{table}", table)
        .replace("{run_date}", &run_date.stamp());
    // -- 🧹 only strip the slash we put there ourselves (empty base path), never a user's leading slash
    if base_path.is_empty() && template.starts_with("{base_path}/") {
        rendered.trim_start_matches('/').to_string()
    } else {
        rendered
    }
}
