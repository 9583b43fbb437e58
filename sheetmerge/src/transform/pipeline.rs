//! Consolidation pipeline.
//!
//! Normalizes every selected sheet and merges them into one
//! [`UnifiedTable`]. Sheets are processed strictly in the given order,
//! one at a time. A sheet that fails is recorded and skipped; it never
//! stops the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetmerge::{open_workbook, Consolidator, ColumnConfigSet, SheetSelection};
//!
//! let mut workbook = open_workbook("sales.xlsx")?;
//! let selection = SheetSelection::parse("1-4", workbook.sheet_count())?;
//! let configs = ColumnConfigSet::load("columns.json")?;
//!
//! let consolidation = Consolidator::new(&configs).run_workbook(workbook.as_mut(), &selection);
//! println!("{}", consolidation.summary());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::classifier::ClassifierRules;
use super::normalizer::{normalize, NormalizedSheet, ResolvedColumn};
use crate::config::ColumnConfigSet;
use crate::logs::{log_info, log_info_indent, log_success_indent, log_warning, log_warning_indent};
use crate::error::SheetError;
use crate::models::{Column, ColumnOrigin, DataType, RawSheet, SheetResult, UnifiedTable, Value, SOURCE_SHEET_COLUMN};
use crate::workbook::{SheetLoad, SheetSelection, WorkbookSource};

// =============================================================================
// Options
// =============================================================================

/// Options for a consolidation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidateOptions {
    /// Rows per sheet sampled by the classifier.
    pub sample_rows: usize,

    /// Classify unconfigured columns. When off, they pass through untouched.
    pub classify: bool,

    /// Classifier name patterns and content threshold.
    pub rules: ClassifierRules,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            sample_rows: 100,
            classify: true,
            rules: ClassifierRules::default(),
        }
    }
}

/// Cooperative cancellation flag, checked between sheets.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of a consolidation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consolidation {
    pub table: UnifiedTable,
    /// One entry per processed sheet, in processing order.
    pub results: Vec<SheetResult>,
    /// Run stopped early; `table` holds the sheets finished before that.
    pub cancelled: bool,
}

impl Consolidation {
    pub fn succeeded(&self) -> impl Iterator<Item = &SheetResult> {
        self.results.iter().filter(|r| r.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &SheetResult> {
        self.results.iter().filter(|r| !r.is_ok())
    }

    pub fn summary(&self) -> ConsolidationSummary {
        ConsolidationSummary {
            processed: self.results.len(),
            succeeded: self.succeeded().count(),
            failed: self.failed().map(|r| (r.sheet_name.clone(), r.error.clone().unwrap_or_default())).collect(),
            total_rows: self.table.row_count(),
            total_columns: self.table.columns.len(),
            cancelled: self.cancelled,
        }
    }
}

/// Final report of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidationSummary {
    pub processed: usize,
    pub succeeded: usize,
    /// `(sheet name, error)` for every failed sheet.
    pub failed: Vec<(String, String)>,
    pub total_rows: usize,
    pub total_columns: usize,
    pub cancelled: bool,
}

impl fmt::Display for ConsolidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 Consolidation summary")?;
        writeln!(f, "   Sheets processed: {}", self.processed)?;
        writeln!(f, "   ✅ Succeeded: {}", self.succeeded)?;
        if !self.failed.is_empty() {
            writeln!(f, "   ❌ Failed: {}", self.failed.len())?;
            for (name, error) in &self.failed {
                writeln!(f, "      - {}: {}", name, error)?;
            }
        }
        if self.cancelled {
            writeln!(f, "   ⚠️  Cancelled before all sheets were processed")?;
        }
        write!(f, "   Rows: {}, columns: {}", self.total_rows, self.total_columns)
    }
}

// =============================================================================
// Column Resolution
// =============================================================================

/// Resolve the directive of every header column of `sheet`.
///
/// Explicit configuration wins; `auto` types are filled in by the
/// classifier from this sheet's own sample. An absent word-count directive
/// is decided from the merged type.
pub fn resolve_columns(sheet: &RawSheet, configs: &ColumnConfigSet, options: &ConsolidateOptions) -> Vec<ResolvedColumn> {
    sheet
        .header
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let explicit = configs.get(name);
            let config = if options.classify {
                let inferred = options.rules.classify(name, &sheet.sample(position, options.sample_rows));
                match explicit {
                    Some(explicit) => {
                        let mut merged = explicit.merge_inferred(&inferred);
                        if merged.word_count.is_none() {
                            merged.word_count = Some(options.rules.word_count_for(name, merged.target_type));
                        }
                        merged
                    }
                    None => inferred,
                }
            } else {
                explicit.cloned().unwrap_or_default()
            };

            ResolvedColumn {
                name: name.clone(),
                data_type: config.target_type,
                word_count: config.word_count.and_then(|wc| wc.spec()),
            }
        })
        .collect()
}

// =============================================================================
// Schema Reconciliation
// =============================================================================

/// Running union of column sets, first-seen order.
#[derive(Debug, Default)]
struct SchemaBuilder {
    source: Vec<Column>,
    derived: Vec<Column>,
    seen: HashSet<String>,
}

impl SchemaBuilder {
    fn add(&mut self, columns: &[Column]) {
        for column in columns {
            if column.origin == ColumnOrigin::Provenance || column.name == SOURCE_SHEET_COLUMN {
                continue;
            }
            if self.seen.insert(column.name.clone()) {
                match column.origin {
                    ColumnOrigin::Derived => self.derived.push(column.clone()),
                    _ => self.source.push(column.clone()),
                }
            }
        }
    }

    /// Source columns, then derived columns, then the provenance column.
    fn finish(self) -> Vec<Column> {
        let mut columns = self.source;
        columns.extend(self.derived);
        columns.push(Column {
            name: SOURCE_SHEET_COLUMN.to_string(),
            data_type: DataType::String,
            origin: ColumnOrigin::Provenance,
        });
        columns
    }
}

/// Lay every sheet's rows out against the full column set.
fn materialize(columns: Vec<Column>, sheets: Vec<NormalizedSheet>) -> UnifiedTable {
    let positions: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect();
    let fill: Vec<Value> = columns.iter().map(|c| c.data_type.missing()).collect();

    let mut rows = Vec::with_capacity(sheets.iter().map(|s| s.row_count()).sum());
    for sheet in sheets {
        let targets: Vec<Option<usize>> = sheet
            .columns
            .iter()
            .map(|c| positions.get(c.name.as_str()).copied())
            .collect();

        for row in sheet.rows {
            let mut out = fill.clone();
            for (value, target) in row.into_iter().zip(&targets) {
                if let Some(i) = *target {
                    out[i] = value;
                }
            }
            rows.push(out);
        }
    }

    UnifiedTable { columns, rows }
}

// =============================================================================
// Consolidator
// =============================================================================

/// Runs a consolidation over a sequence of sheets.
pub struct Consolidator<'a> {
    configs: &'a ColumnConfigSet,
    options: ConsolidateOptions,
    token: CancellationToken,
    progress: Option<Box<dyn FnMut(&SheetResult) + 'a>>,
}

impl<'a> Consolidator<'a> {
    pub fn new(configs: &'a ColumnConfigSet) -> Self {
        Self {
            configs,
            options: ConsolidateOptions::default(),
            token: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn options(mut self, options: ConsolidateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Called with each sheet's result as soon as it is known.
    pub fn on_progress(mut self, callback: impl FnMut(&SheetResult) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Consolidate the selected sheets of `workbook`, reading each lazily.
    pub fn run_workbook(&mut self, workbook: &mut dyn WorkbookSource, selection: &SheetSelection) -> Consolidation {
        let indices = selection.indices().to_vec();
        self.run(indices.into_iter().map(|index| workbook.load(index)))
    }

    /// Consolidate `sheets` in order.
    pub fn run<I>(&mut self, sheets: I) -> Consolidation
    where
        I: IntoIterator<Item = SheetLoad>,
    {
        let mut schema = SchemaBuilder::default();
        let mut normalized: Vec<NormalizedSheet> = Vec::new();
        let mut results: Vec<SheetResult> = Vec::new();
        let mut cancelled = false;

        let mut sheets = sheets.into_iter();
        loop {
            if self.token.is_cancelled() {
                log_warning("Cancellation requested, stopping before the next sheet");
                cancelled = true;
                break;
            }
            let Some(load) = sheets.next() else {
                break;
            };

            log_info(format!("📄 Sheet {}: {}", load.index + 1, load.name));
            let result = match load.sheet.and_then(|sheet| self.process(&sheet)) {
                Ok(sheet) => {
                    log_success_indent(
                        format!("{} rows, {} columns", sheet.row_count(), sheet.columns.len()),
                        1,
                    );
                    schema.add(&sheet.columns);
                    let result = SheetResult::ok(load.index, &load.name, sheet.row_count());
                    normalized.push(sheet);
                    result
                }
                Err(e) => {
                    log_warning_indent(format!("Skipping sheet '{}': {}", load.name, e), 1);
                    SheetResult::failed(load.index, &load.name, e.to_string())
                }
            };

            if let Some(progress) = self.progress.as_mut() {
                progress(&result);
            }
            results.push(result);
        }

        let table = materialize(schema.finish(), normalized);
        Consolidation {
            table,
            results,
            cancelled,
        }
    }

    fn process(&self, sheet: &RawSheet) -> Result<NormalizedSheet, SheetError> {
        let resolved = resolve_columns(sheet, self.configs, &self.options);
        for column in &resolved {
            let word_count = if column.word_count.is_some() { ", word count" } else { "" };
            log_info_indent(format!("{} → {}{}", column.name, column.data_type, word_count), 2);
        }
        normalize(sheet, &resolved)
    }
}

/// Consolidate in-memory sheets with default options.
pub fn consolidate(sheets: Vec<RawSheet>, configs: &ColumnConfigSet) -> Consolidation {
    Consolidator::new(configs).run(sheets.into_iter().map(SheetLoad::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnConfig;
    use crate::error::WorkbookError;
    use crate::models::{MissingKind, SheetStatus};
    use crate::transform::word_count::{WordCount, WordCountSpec};
    use std::sync::Mutex;

    fn text_rows(rows: &[&[&str]]) -> Vec<Vec<Value>> {
        rows.iter()
            .map(|row| row.iter().map(|v| Value::from(*v)).collect())
            .collect()
    }

    fn sheet(index: usize, name: &str, header: &[&str], rows: &[&[&str]]) -> RawSheet {
        RawSheet::new(index, name, header.iter().map(|h| h.to_string()).collect(), text_rows(rows))
    }

    #[test]
    fn test_superset_schema_and_fill() {
        let sheets = vec![
            sheet(0, "S1", &["A", "B"], &[&["1", "x"]]),
            sheet(1, "S2", &["A", "C"], &[&["2", "y"]]),
        ];
        let result = consolidate(sheets, &ColumnConfigSet::new());
        let table = &result.table;

        assert_eq!(table.column_names(), vec!["A", "B", "C", "_Source_Sheet"]);
        assert_eq!(table.row_count(), 2);
        // C never existed in S1: string sentinel
        assert_eq!(table.get(0, "C"), Some(&Value::from("")));
        assert_eq!(table.get(1, "B"), Some(&Value::from("")));
        assert_eq!(table.get(0, "_Source_Sheet"), Some(&Value::from("S1")));
        assert_eq!(table.get(1, "_Source_Sheet"), Some(&Value::from("S2")));
        assert_eq!(table.get(1, "A"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_numeric_fill_is_missing_not_zero() {
        let sheets = vec![
            sheet(0, "S1", &["Name"], &[&["a"]]),
            sheet(1, "S2", &["Name", "Unit Price"], &[&["b", "2.5"]]),
        ];
        let result = consolidate(sheets, &ColumnConfigSet::new());
        assert_eq!(result.table.get(0, "Unit Price"), Some(&Value::Missing(MissingKind::Numeric)));
        assert_eq!(result.table.get(1, "Unit Price"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn test_row_count_is_sum_of_successful_sheets() {
        let sheets = vec![
            sheet(0, "S1", &["A"], &[&["1"], &["2"], &["3"]]),
            sheet(1, "S2", &["A"], &[&["4"]]),
            sheet(2, "Empty", &["A"], &[]),
        ];
        let result = consolidate(sheets, &ColumnConfigSet::new());
        let sum: usize = result.succeeded().map(|r| r.row_count).sum();
        assert_eq!(result.table.row_count(), sum);
        assert_eq!(result.table.row_count(), 4);
    }

    #[test]
    fn test_failed_sheet_is_isolated() {
        let mut sheets: Vec<RawSheet> = (0..10)
            .map(|i| sheet(i, &format!("S{}", i + 1), &["A"], &[&["1"]]))
            .collect();
        // Sheet at index 5 has a row wider than its header
        sheets[5].rows = text_rows(&[&["1", "overflow"]]);

        let result = consolidate(sheets, &ColumnConfigSet::new());

        assert_eq!(result.results.len(), 10);
        assert_eq!(result.succeeded().count(), 9);
        let failed: Vec<&SheetResult> = result.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].sheet_index, 5);
        assert_eq!(failed[0].status, SheetStatus::Failed);
        assert!(failed[0].error.is_some());

        assert_eq!(result.table.row_count(), 9);
        let sources: Vec<String> = (0..9)
            .map(|r| result.table.get(r, "_Source_Sheet").unwrap().to_string())
            .collect();
        assert!(!sources.contains(&"S6".to_string()));
    }

    #[test]
    fn test_read_failure_is_recorded() {
        let loads = vec![
            SheetLoad::from(sheet(0, "Good", &["A"], &[&["1"]])),
            SheetLoad {
                index: 1,
                name: "Bad".into(),
                sheet: Err(SheetError::Read(WorkbookError::SheetOutOfRange { index: 1, total: 1 })),
            },
        ];
        let configs = ColumnConfigSet::new();
        let result = Consolidator::new(&configs).run(loads);

        assert_eq!(result.results[0].status, SheetStatus::Ok);
        assert_eq!(result.results[1].status, SheetStatus::Failed);
        assert_eq!(result.table.row_count(), 1);
    }

    #[test]
    fn test_explicit_word_count_spec() {
        let mut configs = ColumnConfigSet::new();
        configs.insert(
            "Notes",
            ColumnConfig::new(DataType::String)
                .with_word_count(WordCount::Custom(WordCountSpec { min_length: 4, ..Default::default() })),
        );

        let sheets = vec![
            sheet(0, "Jan", &["Notes"], &[&["the quick brown fox"]]),
            sheet(1, "Feb", &["Notes"], &[&["a longer remark"]]),
        ];
        let result = consolidate(sheets, &configs);
        let table = &result.table;

        assert_eq!(table.column_names(), vec!["Notes", "Notes_word_count", "_Source_Sheet"]);
        // "quick", "brown"
        assert_eq!(table.get(0, "Notes_word_count"), Some(&Value::Integer(2)));
        // "longer", "remark"
        assert_eq!(table.get(1, "Notes_word_count"), Some(&Value::Integer(2)));
        assert_eq!(table.get(0, "_Source_Sheet"), Some(&Value::from("Jan")));
        assert_eq!(table.get(1, "_Source_Sheet"), Some(&Value::from("Feb")));
    }

    #[test]
    fn test_explicit_config_is_not_overridden() {
        let mut configs = ColumnConfigSet::new();
        configs.insert("Qty", ColumnConfig::new(DataType::String).with_word_count(WordCount::Disabled));

        let result = consolidate(vec![sheet(0, "S", &["Qty"], &[&["12"]])], &configs);
        assert_eq!(result.table.get(0, "Qty"), Some(&Value::from("12")));
        assert_eq!(result.table.columns[0].data_type, DataType::String);
    }

    #[test]
    fn test_word_count_columns_follow_source_columns() {
        let sheets = vec![
            sheet(0, "S1", &["A", "Notes"], &[&["1", "hello world"]]),
            sheet(1, "S2", &["A", "Z"], &[&["2", "z"]]),
        ];
        let result = consolidate(sheets, &ColumnConfigSet::new());
        assert_eq!(
            result.table.column_names(),
            vec!["A", "Notes", "Z", "Notes_word_count", "_Source_Sheet"]
        );
        assert_eq!(result.table.get(1, "Notes_word_count"), Some(&Value::Missing(MissingKind::Numeric)));
    }

    #[test]
    fn test_cancellation_returns_partial_table() {
        let token = CancellationToken::new();
        let configs = ColumnConfigSet::new();
        let seen = Mutex::new(0usize);

        let sheets: Vec<RawSheet> = (0..5)
            .map(|i| sheet(i, &format!("S{}", i + 1), &["A"], &[&["1"]]))
            .collect();

        let trigger = token.clone();
        let result = Consolidator::new(&configs)
            .cancellation_token(token)
            .on_progress(|_| {
                let mut count = seen.lock().unwrap();
                *count += 1;
                if *count == 2 {
                    trigger.cancel();
                }
            })
            .run(sheets.into_iter().map(SheetLoad::from));

        assert!(result.cancelled);
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.table.row_count(), 2);
        assert!(result.summary().cancelled);
    }

    #[test]
    fn test_raw_mode_passes_values_through() {
        let configs = ColumnConfigSet::new();
        let options = ConsolidateOptions { classify: false, ..Default::default() };
        let result = Consolidator::new(&configs)
            .options(options)
            .run(vec![SheetLoad::from(sheet(0, "S", &["Qty"], &[&["12"]]))]);

        assert_eq!(result.table.get(0, "Qty"), Some(&Value::from("12")));
        assert_eq!(result.table.columns[0].data_type, DataType::Auto);
    }

    #[test]
    fn test_resolution_uses_each_sheets_own_sample() {
        let sheets = vec![
            sheet(0, "S1", &["Code"], &[&["1"], &["2"]]),
            sheet(1, "S2", &["Code"], &[&["A1"], &["B2"]]),
        ];
        let configs = ColumnConfigSet::new();
        let options = ConsolidateOptions::default();
        assert_eq!(resolve_columns(&sheets[0], &configs, &options)[0].data_type, DataType::Integer);
        assert_eq!(resolve_columns(&sheets[1], &configs, &options)[0].data_type, DataType::String);

        // First-seen type describes the unified column
        let result = consolidate(sheets, &configs);
        assert_eq!(result.table.columns[0].data_type, DataType::Integer);
        assert_eq!(result.table.get(1, "Code"), Some(&Value::Integer(2)));
        assert_eq!(result.table.get(2, "Code"), Some(&Value::from("A1")));
    }

    #[test]
    fn test_explicit_type_drives_word_count() {
        let options = ConsolidateOptions::default();
        let mut configs = ColumnConfigSet::new();
        configs.insert("Customer Feedback", ColumnConfig::new(DataType::Integer));
        configs.insert("Order Total", ColumnConfig::new(DataType::String));

        let raw = sheet(0, "S", &["Customer Feedback", "Order Total"], &[&["5", "1"], &["4", "2"]]);
        let resolved = resolve_columns(&raw, &configs, &options);

        assert_eq!(resolved[0].data_type, DataType::Integer);
        assert!(resolved[0].word_count.is_none());
        assert_eq!(resolved[1].data_type, DataType::String);
        assert!(resolved[1].word_count.is_some());
    }

    #[test]
    fn test_auto_type_word_count_uses_inferred_type() {
        let mut configs = ColumnConfigSet::new();
        configs.insert("Order Total", ColumnConfig::new(DataType::Auto));

        let raw = sheet(0, "S", &["Order Total"], &[&["1"], &["2"]]);
        let resolved = resolve_columns(&raw, &configs, &ConsolidateOptions::default());

        assert_eq!(resolved[0].data_type, DataType::Integer);
        assert!(resolved[0].word_count.is_none());
    }

    #[test]
    fn test_consolidation_is_deterministic() {
        let build = || {
            vec![
                sheet(0, "S1", &["A", "Comment"], &[&["1", "nice one"]]),
                sheet(1, "S2", &["B"], &[&["2024-01-01"]]),
            ]
        };
        let configs = ColumnConfigSet::new();
        assert_eq!(consolidate(build(), &configs), consolidate(build(), &configs));
    }

    #[test]
    fn test_summary_display() {
        let sheets = vec![
            sheet(0, "Ok", &["A"], &[&["1"]]),
            RawSheet::new(1, "Broken", vec![], vec![vec![Value::from("x")]]),
        ];
        let summary = consolidate(sheets, &ColumnConfigSet::new()).summary();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed.len(), 1);

        let text = summary.to_string();
        assert!(text.contains("Broken"));
        assert!(text.contains("Rows: 1"));
    }

    #[test]
    fn test_no_sheets() {
        let result = consolidate(vec![], &ColumnConfigSet::new());
        assert_eq!(result.table.column_names(), vec!["_Source_Sheet"]);
        assert!(result.table.is_empty());
        assert!(!result.cancelled);
    }
}
