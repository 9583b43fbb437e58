//! Domain models for the sheet consolidation pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Value`] - A cell value, raw (as read) or coerced (as written)
//! - [`DataType`] - Semantic column type, including `auto`
//! - [`RawSheet`] - One sheet as delivered by a workbook reader
//! - [`UnifiedTable`] - The consolidated output table
//! - [`SheetResult`] - Per-sheet outcome record

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Reserved provenance column appended to every consolidated row.
pub const SOURCE_SHEET_COLUMN: &str = "_Source_Sheet";

/// Suffix of derived word-count columns.
pub const WORD_COUNT_SUFFIX: &str = "_word_count";

/// Name of the derived word-count column for `column`.
pub fn word_count_column(column: &str) -> String {
    format!("{}{}", column, WORD_COUNT_SUFFIX)
}

// =============================================================================
// Cell Values
// =============================================================================

/// Which "no value" a missing cell stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingKind {
    Numeric,
    Boolean,
    Date,
}

/// A single cell.
///
/// Readers produce `Empty`, `Text`, `Integer`, `Float`, `Boolean`, `DateTime`
/// and `Error`. The coercer additionally produces `Category` and `Missing`,
/// the typed "no value" sentinel that is never confused with `0`, `false`
/// or an empty string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Blank cell as read from the source.
    Empty,
    Text(String),
    Category(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    /// Spreadsheet error cell (`#DIV/0!`, `#N/A`, ...).
    Error(String),
    Missing(MissingKind),
}

impl Value {
    /// True for cells that carry no usable value.
    ///
    /// Whitespace-only text counts as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Empty | Value::Error(_) | Value::Missing(_) => true,
            Value::Text(s) | Value::Category(s) => s.trim().is_empty(),
            Value::Float(f) => !f.is_finite(),
            _ => false,
        }
    }

    /// String form of the value, `None` when there is nothing to render.
    ///
    /// Integral floats render without a trailing `.0` so that spreadsheet
    /// numbers (which are stored as floats) read naturally.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::Empty | Value::Error(_) | Value::Missing(_) => None,
            Value::Text(s) | Value::Category(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => format_float(*f),
            Value::Boolean(b) => Some(b.to_string()),
            Value::DateTime(dt) => Some(format_datetime(dt)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_string() {
            Some(s) => f.write_str(&s),
            None => Ok(()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Empty | Value::Error(_) | Value::Missing(_) => serializer.serialize_none(),
            Value::Text(s) | Value::Category(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) => serializer.serialize_none(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::DateTime(dt) => serializer.serialize_str(&format_datetime(dt)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

fn format_float(f: f64) -> Option<String> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() < 1e15 {
        Some(format!("{}", f as i64))
    } else {
        Some(f.to_string())
    }
}

/// `YYYY-MM-DD` for midnight, `YYYY-MM-DD HH:MM:SS` otherwise.
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.time().num_seconds_from_midnight() == 0 && dt.time().nanosecond() == 0 {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// =============================================================================
// Data Types
// =============================================================================

/// Semantic type of a column.
///
/// Parsed case-insensitively, with the usual aliases (`str`, `int`,
/// `decimal`, `bool`, `datetime`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    /// Resolved by the classifier from the column's own values.
    #[default]
    Auto,
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Category,
}

impl DataType {
    /// Parse a type name. Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "auto" => Some(DataType::Auto),
            "string" | "str" | "text" => Some(DataType::String),
            "integer" | "int" | "number" => Some(DataType::Integer),
            "float" | "decimal" | "double" => Some(DataType::Float),
            "boolean" | "bool" => Some(DataType::Boolean),
            "date" | "datetime" => Some(DataType::Date),
            "category" => Some(DataType::Category),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Auto => "auto",
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Category => "category",
        }
    }

    /// The value standing for "no value" in a column of this type.
    pub fn missing(&self) -> Value {
        match self {
            DataType::Auto => Value::Empty,
            DataType::String => Value::Text(String::new()),
            DataType::Category => Value::Category(String::new()),
            DataType::Integer | DataType::Float => Value::Missing(MissingKind::Numeric),
            DataType::Boolean => Value::Missing(MissingKind::Boolean),
            DataType::Date => Value::Missing(MissingKind::Date),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DataType::parse(&value).ok_or_else(|| format!("unknown data type '{}'", value))
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.as_str().to_string()
    }
}

// =============================================================================
// Sheets
// =============================================================================

/// One sheet as delivered by a workbook reader.
///
/// `rows` are positional and aligned with `header`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    /// Zero-based position in the workbook.
    pub index: usize,
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawSheet {
    pub fn new(index: usize, name: impl Into<String>, header: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            index,
            name: name.into(),
            header,
            rows,
        }
    }

    /// Up to `limit` values of column `position`, in row order.
    pub fn sample(&self, position: usize, limit: usize) -> Vec<Value> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| row.get(position).cloned().unwrap_or(Value::Empty))
            .collect()
    }
}

// =============================================================================
// Unified Table
// =============================================================================

/// Where a consolidated column comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnOrigin {
    Source,
    Derived,
    Provenance,
}

/// A column of the unified table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Resolved type; the first sheet that introduced the column wins.
    pub data_type: DataType,
    pub origin: ColumnOrigin,
}

/// The consolidated table.
///
/// Every row holds exactly one value per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnifiedTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl UnifiedTable {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Value at `row` in column `name`.
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let col = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// =============================================================================
// Sheet Results
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetStatus {
    Ok,
    Failed,
}

/// Outcome of processing one sheet.
///
/// `error` is set if and only if `status` is [`SheetStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetResult {
    pub sheet_index: usize,
    pub sheet_name: String,
    pub row_count: usize,
    pub status: SheetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SheetResult {
    pub fn ok(sheet_index: usize, sheet_name: impl Into<String>, row_count: usize) -> Self {
        Self {
            sheet_index,
            sheet_name: sheet_name.into(),
            row_count,
            status: SheetStatus::Ok,
            error: None,
        }
    }

    pub fn failed(sheet_index: usize, sheet_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            sheet_index,
            sheet_name: sheet_name.into(),
            row_count: 0,
            status: SheetStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SheetStatus::Ok
    }
}
