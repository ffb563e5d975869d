//! 🚰 Row fetcher: ask for a page, then another, until the server hands back `[]`.
//!
//! 🧠 Knowledge graph:
//! - Offset starts at 0 and grows by `page_size` after every non-empty page.
//! - An empty page is the end of the table, not an error.
//! - Any page failure aborts the whole table; the rows gathered so far are dropped with it.
//! - R rows at page size P costs ceil(R/P) + 1 requests. The +1 is the empty page that says "done".

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::debug;

use crate::backends::{PageRequest, Source};
use crate::common::Dataset;
use crate::progress::FetchProgress;

/// 📥 Page through `table` until exhaustion and return every row in server order.
pub(crate) async fn fetch_all_rows<S: Source + ?Sized>(
    source: &mut S,
    table: &str,
    page_size: usize,
    filters: &BTreeMap<String, String>,
) -> Result<Dataset> {
    if page_size == 0 {
        anyhow::bail!(
            "💀 Page size 0 for table '{}'. The offset would never move and neither would we.",
            table
        );
    }

    let mut rows = Dataset::new();
    let mut offset = 0usize;
    let mut progress = FetchProgress::new(table);

    loop {
        let page = source
            .fetch_page(PageRequest {
                table,
                limit: page_size,
                offset,
                filters,
            })
            .await
            .context(format!(
                "💀 Paging through '{}' fell over at offset {} after {} rows.",
                table,
                offset,
                rows.len()
            ));
        let page = match page {
            Ok(page) => page,
            Err(err) => {
                progress.finish();
                return Err(err);
            }
        };

        if page.is_empty() {
            debug!(
                "🏁 '{}' exhausted at offset {} ({} rows)",
                table,
                offset,
                progress.total_rows()
            );
            break;
        }

        debug!("📄 '{}' page at offset {}: {} rows", table, offset, page.len());
        progress.update(page.len() as u64);
        rows.extend(page);
        offset += page_size;
    }

    progress.finish();
    Ok(rows)
}
