//! Sheet normalization.
//!
//! Applies resolved column directives to every row of one sheet:
//! each cell is coerced to its column type, word-count columns are
//! derived from the cell's pre-coercion text, and every row is tagged
//! with its source sheet.
//!
//! Cell-level problems never fail a row; they become missing sentinels.
//! Only structural problems fail the sheet.

use serde::Serialize;

use super::coerce::coerce;
use super::word_count::WordCountSpec;
use crate::error::SheetError;
use crate::models::{word_count_column, Column, ColumnOrigin, DataType, RawSheet, Value, SOURCE_SHEET_COLUMN};

/// Fully resolved directive for one source column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedColumn {
    pub name: String,
    pub data_type: DataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<WordCountSpec>,
}

impl ResolvedColumn {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            word_count: None,
        }
    }

    pub fn with_word_count(mut self, spec: WordCountSpec) -> Self {
        self.word_count = Some(spec);
        self
    }
}

/// One sheet after normalization.
///
/// `columns` lists the source columns, then derived word-count columns,
/// then the provenance column. `rows` are aligned with `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSheet {
    pub index: usize,
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl NormalizedSheet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Normalize `sheet` using `resolved`, one entry per header column.
pub fn normalize(sheet: &RawSheet, resolved: &[ResolvedColumn]) -> Result<NormalizedSheet, SheetError> {
    if sheet.header.is_empty() && !sheet.rows.is_empty() {
        return Err(SheetError::MissingHeader { rows: sheet.rows.len() });
    }
    check_row_widths(sheet)?;

    let derived: Vec<(usize, &WordCountSpec)> = resolved
        .iter()
        .enumerate()
        .filter_map(|(position, column)| column.word_count.as_ref().map(|spec| (position, spec)))
        .collect();
    for (position, _) in &derived {
        let name = word_count_column(&resolved[*position].name);
        if resolved.iter().any(|column| column.name == name) {
            return Err(SheetError::DerivedColumnClash { column: name });
        }
    }

    let mut columns: Vec<Column> = resolved
        .iter()
        .map(|column| Column {
            name: column.name.clone(),
            data_type: column.data_type,
            origin: ColumnOrigin::Source,
        })
        .collect();
    columns.extend(derived.iter().map(|(position, _)| Column {
        name: word_count_column(&resolved[*position].name),
        data_type: DataType::Integer,
        origin: ColumnOrigin::Derived,
    }));
    columns.push(Column {
        name: SOURCE_SHEET_COLUMN.to_string(),
        data_type: DataType::String,
        origin: ColumnOrigin::Provenance,
    });

    let rows = sheet
        .rows
        .iter()
        .map(|row| {
            let cell = |position: usize| row.get(position).unwrap_or(&Value::Empty);

            let mut out: Vec<Value> = Vec::with_capacity(columns.len());
            out.extend(
                resolved
                    .iter()
                    .enumerate()
                    .map(|(position, column)| coerce(cell(position), column.data_type)),
            );
            out.extend(
                derived
                    .iter()
                    .map(|(position, spec)| Value::Integer(spec.count_value(cell(*position)) as i64)),
            );
            out.push(Value::Text(sheet.name.clone()));
            out
        })
        .collect();

    Ok(NormalizedSheet {
        index: sheet.index,
        name: sheet.name.clone(),
        columns,
        rows,
    })
}

/// Rows may be shorter than the header (padded with blanks) but not wider,
/// unless the overflow is blank.
fn check_row_widths(sheet: &RawSheet) -> Result<(), SheetError> {
    let columns = sheet.header.len();
    for (i, row) in sheet.rows.iter().enumerate() {
        if row.len() > columns && row[columns..].iter().any(|v| !v.is_missing()) {
            return Err(SheetError::RaggedRow {
                row: i + 1,
                width: row.len(),
                columns,
            });
        }
    }
    Ok(())
}
