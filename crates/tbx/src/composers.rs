//! 🎬 *[the rows are fetched. the sink hungers. the spreadsheet awaits.]*
//!
//! 🎼 The Composers module: turning a dataset into the bytes a sink actually sends.
//!
//! 🧠 Knowledge graph:
//! - **CSV** (`CsvComposer`): header from the first record's key order, one line per record,
//!   CRLF terminators, minimal quoting. The format spreadsheets open without a wizard.
//! - Empty dataset → empty payload. No lonely header row.
//! - Extra keys in later records are dropped; missing keys become empty cells. Permissive on
//!   purpose; schema validation is somebody else's job.
//!
//! 🦆 (the duck composes... spreadsheets? the duck has no comment.)

use anyhow::{Context, Result};
use tracing::{trace, warn};

use crate::common::{Cell, Record};

/// 🧾 Renders a dataset as CSV bytes.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CsvComposer;

impl CsvComposer {
    /// 🎼 Compose every record into one UTF-8 CSV buffer.
    pub(crate) fn compose(&self, records: &[Record]) -> Result<Vec<u8>> {
        let Some(first) = records.first() else {
            return Ok(Vec::new());
        };
        let header: Vec<&str> = first.columns().collect();
        if header.is_empty() {
            // -- 🕳️ a row with zero columns has no header to write and nothing to say
            warn!("⚠️ first record has no columns; composing an empty payload");
            return Ok(Vec::new());
        }

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());

        writer
            .write_record(&header)
            .context("💀 Could not even write the header row. The CSV writer has given up on us.")?;

        for (index, record) in records.iter().enumerate() {
            let row = Self::aligned_fields(&header, record);
            writer.write_record(&row).context(format!(
                "💀 Record #{} refused to become a CSV line.",
                index
            ))?;
        }

        let payload = writer
            .into_inner()
            .map_err(|err| err.into_error())
            .context("💀 The CSV writer held on to its buffer and would not let go.")?;
        trace!(
            "🧾 composed {} records into {} bytes of CSV",
            records.len(),
            payload.len()
        );
        Ok(payload)
    }

    /// 📐 Line a record up against the header.
    ///
    /// Fast path: same columns in the same order as the header (every well-behaved row).
    /// Slow path: look each header column up by name.
    fn aligned_fields(header: &[&str], record: &Record) -> Vec<String> {
        let same_shape = record.len() == header.len()
            && record.columns().zip(header).all(|(column, expected)| column == *expected);
        if same_shape {
            return record
                .fields()
                .iter()
                .map(|(_, cell)| cell.to_csv_field())
                .collect();
        }
        header
            .iter()
            .map(|column| record.get(column).map(Cell::to_csv_field).unwrap_or_default())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn the_rows(json: &str) -> Vec<Record> {
        serde_json::from_str(json).expect("💀 test fixture should be a JSON array of objects")
    }

    fn as_text(payload: Vec<u8>) -> String {
        String::from_utf8(payload).expect("💀 CSV should be UTF-8")
    }

    #[test]
    fn the_one_where_nothing_in_means_nothing_out() {
        let the_payload = CsvComposer.compose(&[]).expect("💀 empty compose");
        assert!(the_payload.is_empty(), "no header-only output for empty tables");
    }

    #[test]
    fn the_one_where_the_header_follows_the_first_record() {
        let the_payload = CsvComposer
            .compose(&the_rows(r#"[{"id":1,"name":"Gangnam","active":true},{"id":2,"name":"Mapo","active":false}]"#))
            .expect("💀 compose");
        assert_eq!(
            as_text(the_payload),
            "id,name,active\r\n1,Gangnam,True\r\n2,Mapo,False\r\n"
        );
    }

    #[test]
    fn the_one_where_the_late_arriving_column_is_left_at_the_door() {
        let the_payload = CsvComposer
            .compose(&the_rows(
                r#"[
                    {"a":0,"b":0,"c":0},
                    {"a":1,"b":1,"c":1},
                    {"a":2,"b":2,"c":2},
                    {"a":3,"b":3,"c":3},
                    {"a":4,"b":4,"c":4},
                    {"a":5,"b":5,"c":5,"d":"dropped"}
                ]"#,
            ))
            .expect("💀 compose");
        let the_text = as_text(the_payload);
        let the_lines: Vec<&str> = the_text.split("\r\n").collect();
        assert_eq!(the_lines[0], "a,b,c");
        assert_eq!(the_lines[6], "5,5,5");
        assert!(!the_text.contains("dropped"));
    }

    #[test]
    fn the_one_where_missing_and_reordered_keys_still_line_up() {
        let the_payload = CsvComposer
            .compose(&the_rows(r#"[{"a":1,"b":2,"c":3},{"c":"z","a":"x"}]"#))
            .expect("💀 compose");
        assert_eq!(as_text(the_payload), "a,b,c\r\n1,2,3\r\nx,,z\r\n");
    }

    #[test]
    fn the_one_where_commas_quotes_and_newlines_get_quoted() {
        let the_payload = CsvComposer
            .compose(&the_rows(
                r#"[{"note":"hello, world","quote":"she said \"hi\"","multi":"line1\nline2","meta":{"k":[1,2]},"gone":null}]"#,
            ))
            .expect("💀 compose");
        assert_eq!(
            as_text(the_payload),
            "note,quote,multi,meta,gone\r\n\"hello, world\",\"she said \"\"hi\"\"\",\"line1\nline2\",\"{\"\"k\"\":[1,2]}\",\r\n"
        );
    }

    #[test]
    fn the_one_where_huge_numerics_are_not_rounded_into_scientific_notation() {
        let the_payload = CsvComposer
            .compose(&the_rows(
                r#"[{"id":123456789012345678901234567890,"amt":0.1,"rate":3.14159265358979323846264}]"#,
            ))
            .expect("💀 compose");
        assert_eq!(
            as_text(the_payload),
            "id,amt,rate\r\n123456789012345678901234567890,0.1,3.14159265358979323846264\r\n"
        );
    }

    #[test]
    fn the_one_where_a_duplicated_key_makes_one_column() {
        let the_payload = CsvComposer
            .compose(&the_rows(r#"[{"id":1,"id":2,"ok":true}]"#))
            .expect("💀 compose");
        assert_eq!(as_text(the_payload), "id,ok\r\n2,True\r\n");
    }

    #[test]
    fn the_one_where_a_columnless_first_record_means_no_payload() {
        let the_payload = CsvComposer
            .compose(&the_rows(r#"[{},{"a":1}]"#))
            .expect("💀 compose");
        assert!(the_payload.is_empty());
    }
}
