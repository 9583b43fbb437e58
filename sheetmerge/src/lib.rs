//! # Sheetmerge - Consolidate workbook sheets into one typed table
//!
//! Sheetmerge reads a range of sheets from a workbook (xlsx, xls, ods or CSV),
//! infers or applies a type per column, adds word-count columns for text, and
//! stacks every sheet into one table over the union of their columns.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Workbook   │────▶│ Classifier  │────▶│ Normalizer  │────▶│ Consolidator│
//! │ (xlsx/csv)  │     │ (+ config)  │     │ (per sheet) │     │ (superset)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    ▼
//!                                                             ┌─────────────┐
//!                                                             │   Export    │
//!                                                             │(xlsx/csv/js)│
//!                                                             └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sheetmerge::{open_workbook, write_table, ColumnConfigSet, Consolidator, SheetSelection};
//!
//! let mut workbook = open_workbook("sales.xlsx")?;
//! let selection = SheetSelection::parse("1-12", workbook.sheet_count())?;
//! let configs = ColumnConfigSet::load("columns.json")?;
//!
//! let result = Consolidator::new(&configs).run_workbook(workbook.as_mut(), &selection);
//! write_table(&result.table, "consolidated.csv")?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Values, data types, sheets and the unified table
//! - [`logs`] - Progress log broadcaster
//! - [`config`] - Column configuration documents and templates
//! - [`validation`] - JSON Schema validation
//! - [`workbook`] - Workbook readers and sheet selection
//! - [`transform`] - Classification, coercion, normalization, consolidation
//! - [`export`] - Writing the consolidated table

// Core modules
pub mod error;
pub mod models;
pub mod logs;

// Configuration
pub mod config;
pub mod validation;

// Reading
pub mod workbook;

// Transformation
pub mod transform;

// Writing
pub mod export;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AppError,
    AppResult,
    ConfigError,
    ExportError,
    SelectionError,
    SheetError,
    WorkbookError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Column,
    ColumnOrigin,
    DataType,
    MissingKind,
    RawSheet,
    SheetResult,
    SheetStatus,
    UnifiedTable,
    Value,
    SOURCE_SHEET_COLUMN,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{ColumnConfig, ColumnConfigSet, ConfigTemplate};

pub use validation::{is_valid, validate, validate_column_config};

// =============================================================================
// Re-exports - Workbooks
// =============================================================================

pub use workbook::{
    open_workbook,
    CsvWorkbook,
    ExcelWorkbook,
    MemoryWorkbook,
    SheetLoad,
    SheetSelection,
    WorkbookSource,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    classify,
    coerce,
    consolidate,
    normalize,
    resolve_columns,
    CancellationToken,
    ClassifierRules,
    ConsolidateOptions,
    Consolidation,
    ConsolidationSummary,
    Consolidator,
    WordCount,
    WordCountSpec,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::write_table;

// =============================================================================
// Re-exports - Logs
// =============================================================================

pub use logs::{LogEntry, LogLevel, LOG_BROADCASTER};
