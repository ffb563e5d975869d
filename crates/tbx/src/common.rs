//! 📦 Common data structures: the rows, the cells, the humble cargo of tbx.
//!
//! 🎬 COLD OPEN. INT. POSTGREST RESPONSE BODY, 2:13 AM
//!
//! A JSON array arrives. Inside: objects. Inside the objects: keys, in the exact
//! order the database felt like emitting them. We keep that order. The header row
//! of every CSV we ever write depends on it, and the header row has trust issues.
//!
//! 🧠 Knowledge graph:
//! - `Record`: one source row, ordered `(column, Cell)` pairs, deserialized straight
//!   from a JSON object without losing key order.
//! - `Cell`: the tagged union a row value collapses into. String conversion for CSV is
//!   explicit (`Cell::to_csv_field`), not "whatever `Display` felt like today".
//! - `Dataset`: every record of one table, in server order.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::{Number, Value};

/// 📦 Every row of one table, in the order the server handed them over.
pub type Dataset = Vec<Record>;

/// 🎯 A single cell value. Four scalars and one "it's complicated".
///
/// JSON arrays and objects land in `Nested` and are written to CSV as compact JSON
/// text. Flattening them into more columns is not our job.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Nested(Value),
}

impl Cell {
    /// 🧾 Render this cell as a CSV field.
    ///
    /// - `Null` → empty
    /// - `Bool` → `True` / `False`, the spelling the published CSVs have always carried
    /// - `Number` → the number exactly as the server wrote it (`42`, `1.5`, `1.0`, 30-digit numerics)
    /// - `Text` → verbatim (the csv writer handles quoting)
    /// - `Nested` → compact JSON
    pub fn to_csv_field(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Bool(true) => "True".to_string(),
            Cell::Bool(false) => "False".to_string(),
            Cell::Number(number) => number.to_string(),
            Cell::Text(text) => text.clone(),
            // -- 🪆 Value's Display is compact JSON. No pretty-printing in a spreadsheet cell, please.
            Cell::Nested(value) => value.to_string(),
        }
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(flag) => Cell::Bool(flag),
            Value::Number(number) => Cell::Number(number),
            Value::String(text) => Cell::Text(text),
            nested @ (Value::Array(_) | Value::Object(_)) => Cell::Nested(nested),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Cell::from)
    }
}

/// 🎯 One source row: column names paired with cells, in the server's key order.
///
/// Backed by a `Vec` rather than a hash map on purpose: the first record's key order
/// *is* the CSV header, and a `HashMap` would shuffle it like a bored croupier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Cell)>,
}

impl Record {
    /// 🏗️ Build a record from `(column, cell)` pairs. Order is preserved, duplicates are not checked;
    /// deserialized rows go through `insert` instead.
    pub fn new(fields: Vec<(String, Cell)>) -> Self {
        Self { fields }
    }

    /// 🔑 Column names in their original order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(column, _)| column.as_str())
    }

    /// 🔍 Look up one cell by column name. Linear scan; rows are tens of columns, not thousands.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    /// 📋 Borrow the raw `(column, cell)` pairs.
    pub fn fields(&self) -> &[(String, Cell)] {
        &self.fields
    }

    /// 🔁 Set a column. A repeated column keeps its first position and takes the newest value.
    pub fn insert(&mut self, column: String, cell: Cell) {
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = cell,
            None => self.fields.push((column, cell)),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Cell)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Cell)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

// 🎭 Hand-rolled visitor so the map entries arrive in document order.
// serde_json::Map without `preserve_order` is a BTreeMap and would alphabetize our header.
struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON object representing one table row")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut record = Record {
            fields: Vec::with_capacity(access.size_hint().unwrap_or(0)),
        };
        while let Some((column, cell)) = access.next_entry::<String, Cell>()? {
            record.insert(column, cell);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}
