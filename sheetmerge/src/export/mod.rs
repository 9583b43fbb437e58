//! Writing the consolidated table.
//!
//! The format follows the output extension:
//!
//! - `.xlsx` - one `Consolidated_Data` worksheet; missing values are
//!   empty cells, dates keep a date format
//! - `.csv` - header row then data rows; missing values are blank cells
//! - `.json` - `{"sheet": ..., "columns": [...], "rows": [[...], ...]}`
//!   with missing values as `null`

use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{ExportError, ExportResult};
use crate::models::{UnifiedTable, Value};

/// Name given to the consolidated sheet.
pub const CONSOLIDATED_SHEET_NAME: &str = "Consolidated_Data";

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xlsx,
    Csv,
    Json,
}

impl OutputFormat {
    /// Format for `path`, from its extension.
    pub fn from_path(path: &Path) -> ExportResult<Self> {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()).as_deref() {
            Some("xlsx") => Ok(OutputFormat::Xlsx),
            Some("csv") => Ok(OutputFormat::Csv),
            Some("json") => Ok(OutputFormat::Json),
            _ => Err(ExportError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

#[derive(Serialize)]
struct JsonTable<'a> {
    sheet: &'a str,
    columns: Vec<&'a str>,
    rows: &'a [Vec<Value>],
}

/// Write `table` to `path` in the format its extension names.
pub fn write_table(table: &UnifiedTable, path: impl AsRef<Path>) -> ExportResult<()> {
    let path = path.as_ref();
    match OutputFormat::from_path(path)? {
        OutputFormat::Xlsx => write_xlsx(table, path),
        OutputFormat::Csv => write_csv(table, BufWriter::new(File::create(path)?)),
        OutputFormat::Json => write_json(table, BufWriter::new(File::create(path)?)),
    }
}

/// Write `table` as a single-sheet xlsx workbook.
pub fn write_xlsx(table: &UnifiedTable, path: &Path) -> ExportResult<()> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(CONSOLIDATED_SHEET_NAME)?;

    for (col, name) in table.column_names().into_iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let col = col as u16;
            if value.is_missing() {
                continue;
            }
            match value {
                Value::Text(s) | Value::Category(s) => {
                    worksheet.write_string(r, col, s.as_str())?;
                }
                Value::Integer(i) => {
                    worksheet.write_number(r, col, *i as f64)?;
                }
                Value::Float(f) => {
                    worksheet.write_number(r, col, *f)?;
                }
                Value::Boolean(b) => {
                    worksheet.write_boolean(r, col, *b)?;
                }
                Value::DateTime(dt) => {
                    worksheet.write_datetime_with_format(r, col, dt, &date_format)?;
                }
                Value::Empty | Value::Error(_) | Value::Missing(_) => {}
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Write `table` as CSV.
pub fn write_csv<W: Write>(table: &UnifiedTable, writer: W) -> ExportResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(table.column_names())?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|v| v.as_string().unwrap_or_default()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `table` as pretty JSON.
pub fn write_json<W: Write>(table: &UnifiedTable, mut writer: W) -> ExportResult<()> {
    let document = JsonTable {
        sheet: CONSOLIDATED_SHEET_NAME,
        columns: table.column_names(),
        rows: &table.rows,
    };
    serde_json::to_writer_pretty(&mut writer, &document)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, ColumnOrigin, DataType, MissingKind};
    use crate::workbook::{ExcelWorkbook, WorkbookSource};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn table() -> UnifiedTable {
        UnifiedTable {
            columns: vec![
                Column { name: "Qty".into(), data_type: DataType::Integer, origin: ColumnOrigin::Source },
                Column { name: "Note".into(), data_type: DataType::String, origin: ColumnOrigin::Source },
                Column { name: "_Source_Sheet".into(), data_type: DataType::String, origin: ColumnOrigin::Provenance },
            ],
            rows: vec![
                vec![Value::Integer(3), Value::from("hi, there"), Value::from("S1")],
                vec![Value::Missing(MissingKind::Numeric), Value::from(""), Value::from("S2")],
            ],
        }
    }

    #[test]
    fn test_csv_output() {
        let mut buffer = Vec::new();
        write_csv(&table(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "Qty,Note,_Source_Sheet\n3,\"hi, there\",S1\n,,S2\n");
    }

    #[test]
    fn test_json_output() {
        let mut buffer = Vec::new();
        write_json(&table(), &mut buffer).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(json["sheet"], "Consolidated_Data");
        assert_eq!(json["columns"][2], "_Source_Sheet");
        assert_eq!(json["rows"][0][0], 3);
        assert!(json["rows"][1][0].is_null());
    }

    #[test]
    fn test_write_table_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.CSV");
        write_table(&table(), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("Qty,Note"));
    }

    #[test]
    fn test_xlsx_output_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut table = table();
        let when = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
        table.columns.insert(
            2,
            Column { name: "When".into(), data_type: DataType::Date, origin: ColumnOrigin::Source },
        );
        table.rows[0].insert(2, Value::DateTime(when));
        table.rows[1].insert(2, Value::Missing(MissingKind::Date));

        write_table(&table, &path).unwrap();

        let mut workbook = ExcelWorkbook::open(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Consolidated_Data"]);

        let sheet = workbook.read_sheet(0).unwrap();
        assert_eq!(sheet.header, vec!["Qty", "Note", "When", "_Source_Sheet"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][0], Value::Float(3.0));
        assert_eq!(sheet.rows[0][1], Value::from("hi, there"));
        assert_eq!(sheet.rows[0][2], Value::DateTime(when));
        // Missing sentinels are empty cells
        assert_eq!(sheet.rows[1][0], Value::Empty);
        assert_eq!(sheet.rows[1][1], Value::Empty);
        assert_eq!(sheet.rows[1][2], Value::Empty);
        assert_eq!(sheet.rows[1][3], Value::from("S2"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let result = write_table(&table(), dir.path().join("out.ods"));
        assert!(matches!(result, Err(ExportError::UnsupportedFormat(_))));
    }
}
