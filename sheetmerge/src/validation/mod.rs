//! JSON Schema validation for column configuration documents.
//!
//! The schema is embedded at compile time from
//! `schemas/column-config.json` and checked with JSON Schema Draft 7
//! before a document is deserialized, so that structural mistakes are
//! reported all at once.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use sheetmerge::validation::validate_column_config;
//!
//! let doc = json!({
//!     "Notes": { "dtype": "string", "word_count": { "min_length": 4 } },
//!     "Price": { "dtype": "float" }
//! });
//! assert!(validate_column_config(&doc).is_ok());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static COLUMN_CONFIG_SCHEMA: Lazy<Result<Value, String>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/column-config.json"))
        .map_err(|e| format!("Invalid embedded schema: {}", e))
});

/// Validate `data` against `schema`.
///
/// Returns every validation error, not just the first.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick yes/no check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a column configuration document.
pub fn validate_column_config(data: &Value) -> Result<(), Vec<String>> {
    let schema = COLUMN_CONFIG_SCHEMA.as_ref().map_err(|e| vec![e.clone()])?;
    validate(schema, data)
}
