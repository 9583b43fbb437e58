//! Delimited text files as single-sheet workbooks.
//!
//! Encoding is detected with chardet and decoded with encoding_rs; the
//! delimiter is picked from the first line. Rows are read leniently so
//! that rows wider than the header reach the normalizer, which decides
//! whether the sheet is usable.

use std::path::Path;

use super::{sanitize_header, WorkbookSource};
use crate::error::{WorkbookError, WorkbookResult};
use crate::models::{RawSheet, Value};

/// A CSV/TSV file, decoded up front.
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    name: String,
    sheet_name: String,
    content: String,
    encoding: String,
    delimiter: char,
}

impl CsvWorkbook {
    /// Read `path`, detecting encoding and delimiter.
    pub fn open(path: impl AsRef<Path>) -> WorkbookResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let sheet_name = path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Sheet1".to_string());

        Ok(Self::from_bytes(name, sheet_name, &bytes))
    }

    /// Decode in-memory bytes.
    pub fn from_bytes(name: impl Into<String>, sheet_name: impl Into<String>, bytes: &[u8]) -> Self {
        let encoding = detect_encoding(bytes);
        let content = decode_content(bytes, &encoding);
        let delimiter = detect_delimiter(&content);

        Self {
            name: name.into(),
            sheet_name: sheet_name.into(),
            content,
            encoding,
            delimiter,
        }
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }
}

impl WorkbookSource for CsvWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        vec![self.sheet_name.clone()]
    }

    fn read_sheet(&mut self, index: usize) -> WorkbookResult<RawSheet> {
        if index != 0 {
            return Err(WorkbookError::SheetOutOfRange { index, total: 1 });
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter as u8)
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(self.content.as_bytes());

        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => sanitize_header(&record?.iter().map(str::to_string).collect::<Vec<_>>()),
            None => Vec::new(),
        };

        let mut rows = Vec::new();
        for record in records {
            let record = record?;
            let row: Vec<Value> = record
                .iter()
                .map(|field| if field.is_empty() { Value::Empty } else { Value::from(field) })
                .collect();
            // Empty lines skipped
            if row.iter().all(Value::is_missing) {
                continue;
            }
            rows.push(row);
        }

        Ok(RawSheet::new(0, self.sheet_name.clone(), header, rows))
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes with the named encoding, replacing invalid sequences.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(encoding) => encoding.decode(bytes).0.to_string(),
            None => String::from_utf8_lossy(bytes).to_string(),
        },
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn read(content: &str) -> RawSheet {
        CsvWorkbook::from_bytes("t.csv", "t", content.as_bytes())
            .read_sheet(0)
            .unwrap()
    }

    #[test]
    fn test_simple_csv() {
        let sheet = read("name;age\nAlice;30\nBob;25");
        assert_eq!(sheet.header, vec!["name", "age"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0], vec![Value::from("Alice"), Value::from("30")]);
    }

    #[test]
    fn test_quoted_values() {
        let sheet = read("name,value\n\"Alice\",\"Hello, World\"");
        assert_eq!(sheet.rows[0][1], Value::from("Hello, World"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let sheet = read("a;b\n1;2\n\n;\n3;4\n");
        assert_eq!(sheet.rows.len(), 2);
    }

    #[test]
    fn test_missing_values_are_empty() {
        let sheet = read("a;b;c\n1;;3");
        assert_eq!(sheet.rows[0][1], Value::Empty);
    }

    #[test]
    fn test_ragged_rows_are_kept() {
        let sheet = read("a;b\n1;2;3;4");
        assert_eq!(sheet.rows[0].len(), 4);
    }

    #[test]
    fn test_blank_header_names() {
        let sheet = read("a,,a\n1,2,3");
        assert_eq!(sheet.header, vec!["a", "Unnamed: 1", "a.1"]);
    }

    #[test]
    fn test_empty_file() {
        let sheet = read("");
        assert!(sheet.header.is_empty());
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn test_single_sheet_only() {
        let mut workbook = CsvWorkbook::from_bytes("t.csv", "t", b"a\n1");
        assert_eq!(workbook.sheet_names(), vec!["t"]);
        assert!(matches!(
            workbook.read_sheet(1),
            Err(WorkbookError::SheetOutOfRange { index: 1, total: 1 })
        ));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        assert_eq!(decode_content(bytes, "iso-8859-1"), "Société");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let sheet = read("\u{feff}id,name\n1,x");
        assert_eq!(sheet.header[0], "id");
    }

    #[test]
    fn test_open_file_uses_stem_as_sheet_name() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        write!(file, "Region,Total\nNorth,10\n").unwrap();

        let mut workbook = CsvWorkbook::open(file.path()).unwrap();
        let stem = file.path().file_stem().unwrap().to_string_lossy().to_string();
        assert_eq!(workbook.sheet_names(), vec![stem]);
        assert_eq!(workbook.delimiter(), ',');
        assert_eq!(workbook.read_sheet(0).unwrap().rows.len(), 1);
    }
}
