//! Column configuration.
//!
//! A configuration document is a JSON object keyed by column name:
//!
//! ```json
//! {
//!   "Notes":     { "dtype": "string", "word_count": { "min_length": 4 } },
//!   "Price":     { "dtype": "float" },
//!   "Is Active": { "dtype": "bool", "word_count": false }
//! }
//! ```
//!
//! Documents are checked against the embedded JSON Schema, then each entry
//! is deserialized into a [`ColumnConfig`]. Columns without an entry, or
//! with `"dtype": "auto"`, are resolved by the classifier.

pub mod template;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::models::DataType;
use crate::transform::word_count::WordCount;
use crate::validation::validate_column_config;

pub use template::{default_template_path, ConfigTemplate};

/// Processing directive for one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Target type; `auto` defers to the classifier.
    #[serde(rename = "dtype", alias = "target_type", default)]
    pub target_type: DataType,

    /// Word-count directive. Absent means "let the classifier decide".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<WordCount>,

    /// Free text for humans, ignored by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnConfig {
    pub fn new(target_type: DataType) -> Self {
        Self {
            target_type,
            ..Default::default()
        }
    }

    pub fn with_word_count(mut self, word_count: WordCount) -> Self {
        self.word_count = Some(word_count);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Short human description: `"word_count, dtype=string"`, or
    /// `"no transformations"` when nothing is configured.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.word_count.as_ref().is_some_and(WordCount::is_enabled) {
            parts.push("word_count".to_string());
        }
        if self.target_type != DataType::Auto {
            parts.push(format!("dtype={}", self.target_type));
        }
        if parts.is_empty() {
            "no transformations".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Fill an `auto` type of this explicit config from an inferred one.
    ///
    /// The word-count directive is kept as configured, absent included:
    /// it depends on the merged type, so the caller decides it afterwards
    /// (see [`ClassifierRules::word_count_for`]).
    ///
    /// [`ClassifierRules::word_count_for`]: crate::transform::classifier::ClassifierRules::word_count_for
    pub fn merge_inferred(&self, inferred: &ColumnConfig) -> ColumnConfig {
        ColumnConfig {
            target_type: match self.target_type {
                DataType::Auto => inferred.target_type,
                explicit => explicit,
            },
            word_count: self.word_count.clone(),
            description: self.description.clone(),
        }
    }
}

/// Explicit configuration for a set of columns, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnConfigSet {
    entries: Vec<(String, ColumnConfig)>,
    index: HashMap<String, usize>,
}

impl ColumnConfigSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse and validate a configuration document.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let document: JsonValue = serde_json::from_str(json)?;
        Self::from_value(document)
    }

    /// Validate an already-parsed document.
    pub fn from_value(document: JsonValue) -> ConfigResult<Self> {
        validate_column_config(&document).map_err(|errors| ConfigError::Schema { errors })?;

        let JsonValue::Object(columns) = document else {
            return Err(ConfigError::Schema {
                errors: vec!["configuration must be a JSON object".to_string()],
            });
        };

        let mut set = Self::new();
        for (column, raw) in columns {
            let config: ColumnConfig = serde_json::from_value(raw).map_err(|e| ConfigError::InvalidColumn {
                column: column.clone(),
                message: e.to_string(),
            })?;
            set.insert(column, config);
        }
        Ok(set)
    }

    /// Insert or replace the entry for `column`.
    pub fn insert(&mut self, column: impl Into<String>, config: ColumnConfig) {
        let column = column.into();
        match self.index.get(&column) {
            Some(&position) => self.entries[position].1 = config,
            None => {
                self.index.insert(column.clone(), self.entries.len());
                self.entries.push((column, config));
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&ColumnConfig> {
        self.index.get(column).map(|&position| &self.entries[position].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnConfig)> {
        self.entries.iter().map(|(name, config)| (name.as_str(), config))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty JSON in document order.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the document to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }
}

impl Serialize for ColumnConfigSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl FromIterator<(String, ColumnConfig)> for ColumnConfigSet {
    fn from_iter<I: IntoIterator<Item = (String, ColumnConfig)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (column, config) in iter {
            set.insert(column, config);
        }
        set
    }
}
