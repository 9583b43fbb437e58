//! Spreadsheet workbooks (xlsx, xlsm, xlsb, xls, ods) via calamine.
//!
//! The first row of each sheet's used range is the header. Fully blank
//! data rows are dropped. Native cell types (numbers, booleans,
//! date-times, error cells) are kept as they are.

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::DateTime;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::{sanitize_header, WorkbookSource};
use crate::error::{WorkbookError, WorkbookResult};
use crate::models::{RawSheet, Value};

/// A spreadsheet file opened with calamine.
pub struct ExcelWorkbook {
    name: String,
    sheets: Sheets<BufReader<File>>,
    sheet_names: Vec<String>,
}

impl ExcelWorkbook {
    pub fn open(path: impl AsRef<Path>) -> WorkbookResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WorkbookError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }

        let sheets = open_workbook_auto(path)?;
        let sheet_names = sheets.sheet_names().to_vec();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            name,
            sheets,
            sheet_names,
        })
    }
}

impl WorkbookSource for ExcelWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheet_names.clone()
    }

    fn read_sheet(&mut self, index: usize) -> WorkbookResult<RawSheet> {
        let sheet_name = self
            .sheet_names
            .get(index)
            .cloned()
            .ok_or(WorkbookError::SheetOutOfRange { index, total: self.sheet_names.len() })?;

        let range = self.sheets.worksheet_range(&sheet_name)?;
        let mut rows = range.rows();

        let header: Vec<String> = match rows.next() {
            Some(cells) => sanitize_header(
                &cells
                    .iter()
                    .map(|c| to_value(c).as_string().unwrap_or_default())
                    .collect::<Vec<_>>(),
            ),
            None => Vec::new(),
        };

        let rows: Vec<Vec<Value>> = rows
            .map(|cells| cells.iter().map(to_value).collect::<Vec<_>>())
            .filter(|row| !row.iter().all(Value::is_missing))
            .collect();

        Ok(RawSheet::new(index, sheet_name, header, rows))
    }
}

/// Map a calamine cell to a [`Value`].
pub fn to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::Text(s.to_owned()),
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Boolean(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Value::DateTime(naive),
            None => Value::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Value::DateTime(dt.naive_local()))
            .unwrap_or_else(|_| Value::Text(s.to_owned())),
        Data::DurationIso(s) => Value::Text(s.to_owned()),
        Data::Error(e) => Value::Error(e.to_string()),
    }
}
