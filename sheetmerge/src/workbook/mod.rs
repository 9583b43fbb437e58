//! Workbook access.
//!
//! A [`WorkbookSource`] enumerates sheets and reads one sheet at a time
//! into a [`RawSheet`]. Readers:
//!
//! - [`ExcelWorkbook`] - xlsx, xlsm, xlsb, xls and ods via calamine
//! - [`CsvWorkbook`] - a delimited text file as a single sheet
//! - [`MemoryWorkbook`] - sheets already in memory
//!
//! [`open_workbook`] picks the reader from the file extension.

pub mod delimited;
pub mod excel;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{SelectionError, SheetError, WorkbookError, WorkbookResult};
use crate::models::{RawSheet, Value};

pub use delimited::CsvWorkbook;
pub use excel::ExcelWorkbook;

static RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s*-\s*(\d+)\s*$").expect("Invalid range pattern")
});

// =============================================================================
// Sources
// =============================================================================

/// A sheet as handed to the consolidator: read, or failed to read.
#[derive(Debug)]
pub struct SheetLoad {
    pub index: usize,
    pub name: String,
    pub sheet: Result<RawSheet, SheetError>,
}

impl From<RawSheet> for SheetLoad {
    fn from(sheet: RawSheet) -> Self {
        Self {
            index: sheet.index,
            name: sheet.name.clone(),
            sheet: Ok(sheet),
        }
    }
}

/// Something sheets can be read from.
pub trait WorkbookSource {
    /// Display name of the workbook (usually the file name).
    fn name(&self) -> &str;

    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Read the sheet at zero-based `index`.
    fn read_sheet(&mut self, index: usize) -> WorkbookResult<RawSheet>;

    fn sheet_count(&self) -> usize {
        self.sheet_names().len()
    }

    /// Read a sheet, keeping its identity even when reading fails.
    fn load(&mut self, index: usize) -> SheetLoad {
        let name = self
            .sheet_names()
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Sheet{}", index + 1));
        SheetLoad {
            index,
            name,
            sheet: self.read_sheet(index).map_err(SheetError::from),
        }
    }
}

/// Open `path` with the reader matching its extension.
pub fn open_workbook(path: impl AsRef<Path>) -> WorkbookResult<Box<dyn WorkbookSource + Send>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "xlam" | "ods" => Ok(Box::new(ExcelWorkbook::open(path)?)),
        "csv" | "tsv" | "txt" => Ok(Box::new(CsvWorkbook::open(path)?)),
        _ => Err(WorkbookError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Sheets held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    name: String,
    sheets: Vec<RawSheet>,
}

impl MemoryWorkbook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheets: Vec::new(),
        }
    }

    /// Append a sheet; its index becomes its position.
    pub fn with_sheet(mut self, name: impl Into<String>, header: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let index = self.sheets.len();
        self.sheets.push(RawSheet::new(index, name, header, rows));
        self
    }
}

impl WorkbookSource for MemoryWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn read_sheet(&mut self, index: usize) -> WorkbookResult<RawSheet> {
        self.sheets
            .get(index)
            .cloned()
            .ok_or(WorkbookError::SheetOutOfRange { index, total: self.sheets.len() })
    }
}

// =============================================================================
// Header Sanitation
// =============================================================================

/// Make header names usable as column keys.
///
/// Blank names become `Unnamed: {position}`; repeated names get a
/// `.1`, `.2`, ... suffix.
pub fn sanitize_header(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut header = Vec::with_capacity(raw.len());

    for (position, name) in raw.iter().enumerate() {
        let name = name.trim();
        let base = if name.is_empty() {
            format!("Unnamed: {}", position)
        } else {
            name.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 0;
        while seen.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}.{}", base, suffix);
        }
        seen.insert(candidate.clone());
        header.push(candidate);
    }
    header
}

// =============================================================================
// Sheet Selection
// =============================================================================

/// Ordered list of sheets to consolidate, as zero-based indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSelection {
    indices: Vec<usize>,
}

impl SheetSelection {
    /// Parse `"2-5"` (inclusive range) or `"1,3,5"` (list), 1-based,
    /// against a workbook of `total` sheets. List order is kept.
    pub fn parse(spec: &str, total: usize) -> Result<Self, SelectionError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(SelectionError::Empty);
        }

        let numbers: Vec<usize> = if let Some(caps) = RANGE_PATTERN.captures(spec) {
            let start = parse_sheet_number(&caps[1], spec)?;
            let end = parse_sheet_number(&caps[2], spec)?;
            if start > end {
                return Err(SelectionError::Reversed { start, end });
            }
            (start..=end).collect()
        } else {
            spec.split(',')
                .map(|part| parse_sheet_number(part.trim(), spec))
                .collect::<Result<_, _>>()?
        };

        for &sheet in &numbers {
            if sheet == 0 || sheet > total {
                return Err(SelectionError::OutOfRange { sheet, total });
            }
        }

        Ok(Self {
            indices: numbers.into_iter().map(|n| n - 1).collect(),
        })
    }

    /// Every sheet of a workbook of `total` sheets.
    pub fn all(total: usize) -> Self {
        Self {
            indices: (0..total).collect(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

fn parse_sheet_number(text: &str, spec: &str) -> Result<usize, SelectionError> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(SelectionError::Malformed(spec.to_string()));
    }
    text.parse().map_err(|_| SelectionError::Malformed(spec.to_string()))
}
