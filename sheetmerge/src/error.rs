//! Error types for the sheet consolidation pipeline.
//!
//! Errors are split by tier:
//!
//! - [`WorkbookError`] - Opening or reading a workbook
//! - [`SelectionError`] - Invalid sheet selection (`"1-5"`, `"1,3,5"`)
//! - [`ConfigError`] - Unreadable or invalid column configuration
//! - [`SheetError`] - A single sheet could not be processed (recoverable)
//! - [`ExportError`] - Writing the consolidated table
//! - [`AppError`] - Top-level errors that stop a run before any output
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Workbook Errors
// =============================================================================

/// Errors while opening or reading a workbook.
#[derive(Debug, Error)]
pub enum WorkbookError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet container could not be decoded.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Delimited text could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Extension not handled by any reader.
    #[error("Unsupported workbook format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Sheet index past the end of the workbook.
    #[error("Sheet index {index} out of range (workbook has {total} sheets)")]
    SheetOutOfRange { index: usize, total: usize },
}

// =============================================================================
// Selection Errors
// =============================================================================

/// Errors while parsing a sheet selection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// Nothing to parse.
    #[error("Sheet selection is empty")]
    Empty,

    /// Not a range or a list of numbers.
    #[error("Invalid sheet selection '{0}': use '1-5' or '1,3,5'")]
    Malformed(String),

    /// Range bounds reversed.
    #[error("Invalid sheet range {start}-{end}: start is after end")]
    Reversed { start: usize, end: usize },

    /// Sheet number outside `1..=total`.
    #[error("Sheet {sheet} does not exist (workbook has {total} sheets)")]
    OutOfRange { sheet: usize, total: usize },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading a column configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema validation failed.
    #[error("Config does not match schema: {}", errors.join("; "))]
    Schema { errors: Vec<String> },

    /// Semantically invalid column entry.
    #[error("Invalid config for column '{column}': {message}")]
    InvalidColumn { column: String, message: String },
}

// =============================================================================
// Sheet Errors (recoverable)
// =============================================================================

/// Failure of a single sheet. Recorded in its `SheetResult`, never fatal.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Reader could not deliver the sheet.
    #[error("{0}")]
    Read(#[from] WorkbookError),

    /// Sheet has data rows but no header.
    #[error("Sheet has {rows} data rows but no header")]
    MissingHeader { rows: usize },

    /// Data row wider than the header.
    #[error("Row {row} has {width} cells but the header has {columns} columns")]
    RaggedRow { row: usize, width: usize, columns: usize },

    /// Derived word-count column would replace a source column.
    #[error("Column '{column}' clashes with a derived word-count column")]
    DerivedColumnClash { column: String },
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing the consolidated table.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error.
    #[error("Cannot write output: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error.
    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),

    /// Spreadsheet writer error.
    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Extension not handled by any writer.
    #[error("Unsupported output format: {} (use .xlsx, .csv or .json)", .0.display())]
    UnsupportedFormat(PathBuf),
}

// =============================================================================
// Application Errors (top-level)
// =============================================================================

/// Top-level errors. Any of these stops a run before output is produced.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Workbook error.
    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),

    /// Selection error.
    #[error("{0}")]
    Selection(#[from] SelectionError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Every selected sheet failed.
    #[error("No data was processed successfully ({0} sheets failed)")]
    NothingConsolidated(usize),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for workbook operations.
pub type WorkbookResult<T> = Result<T, WorkbookError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for top-level operations.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // SelectionError -> AppError
        let err: AppError = SelectionError::OutOfRange { sheet: 9, total: 3 }.into();
        assert!(err.to_string().contains("Sheet 9"));

        // ConfigError -> AppError
        let err: AppError = ConfigError::Schema { errors: vec!["bad dtype".into()] }.into();
        assert!(err.to_string().contains("bad dtype"));

        // WorkbookError -> SheetError
        let err: SheetError = WorkbookError::SheetOutOfRange { index: 4, total: 2 }.into();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_ragged_row_format() {
        let err = SheetError::RaggedRow { row: 7, width: 5, columns: 3 };
        let msg = err.to_string();
        assert!(msg.contains("Row 7"));
        assert!(msg.contains("5 cells"));
        assert!(msg.contains("3 columns"));
    }
}
