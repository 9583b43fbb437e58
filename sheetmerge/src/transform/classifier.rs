//! Column classification.
//!
//! Infers a [`ColumnConfig`] for columns without an explicit one, first
//! from the column name and then from a sample of its values.
//!
//! # Name rules
//!
//! Case-insensitive substring match, first match wins:
//!
//! | patterns                                       | result                  |
//! |------------------------------------------------|-------------------------|
//! | `is_`, `has_`, `flag`, `status`, `active`      | boolean                 |
//! | `date`, `time`, `created`, `modified`          | date                    |
//! | `price`, `cost`, `amount`, `quantity`, `number`| float                   |
//! | `description`, `note`, `comment`, `remark`, `text` | string + word count |
//!
//! # Content rules
//!
//! Over the non-missing sample values, with the default 90% threshold:
//! native booleans, then integral numbers, then numbers, then dates.
//! Anything else is a string.

use serde::{Deserialize, Serialize};

use super::coerce::{parse_datetime, parse_number};
use super::word_count::WordCount;
use crate::config::ColumnConfig;
use crate::models::{DataType, Value};

/// Trailing name tokens that mark a multi-word name as an identifier.
const IDENTIFIER_TOKENS: &[&str] = &["id", "ids", "code", "key", "no", "ref", "sku", "uuid"];

/// Tunable classification rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    pub boolean_patterns: Vec<String>,
    pub date_patterns: Vec<String>,
    pub numeric_patterns: Vec<String>,
    pub text_patterns: Vec<String>,
    /// Share of non-missing samples that must agree on a type (0.0 to 1.0).
    pub content_threshold: f64,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        fn owned(patterns: &[&str]) -> Vec<String> {
            patterns.iter().map(|p| p.to_string()).collect()
        }

        Self {
            boolean_patterns: owned(&["is_", "has_", "flag", "status", "active"]),
            date_patterns: owned(&["date", "time", "created", "modified"]),
            numeric_patterns: owned(&["price", "cost", "amount", "quantity", "number"]),
            text_patterns: owned(&["description", "note", "comment", "remark", "text"]),
            content_threshold: 0.9,
        }
    }
}

impl ClassifierRules {
    /// Infer the configuration of `column_name` from its name and `samples`.
    ///
    /// Deterministic for a given name and sample.
    pub fn classify(&self, column_name: &str, samples: &[Value]) -> ColumnConfig {
        let data_type = match self.classify_by_name(column_name) {
            Some(data_type) => data_type,
            None => self.classify_by_content(samples),
        };

        ColumnConfig {
            target_type: data_type,
            word_count: Some(self.word_count_for(column_name, data_type)),
            description: None,
        }
    }

    /// Word-count directive for a column already resolved to `data_type`.
    ///
    /// Only string columns are counted: those whose name matches a text
    /// pattern, and those with a multi-word name.
    pub fn word_count_for(&self, column_name: &str, data_type: DataType) -> WordCount {
        let enabled = data_type == DataType::String
            && (self.matches_any(column_name, &self.text_patterns) || is_multi_word_name(column_name));
        if enabled {
            WordCount::Default
        } else {
            WordCount::Disabled
        }
    }

    fn matches_any(&self, column_name: &str, patterns: &[String]) -> bool {
        let name = column_name.to_lowercase();
        patterns.iter().any(|p| name.contains(&p.to_lowercase()))
    }

    fn classify_by_name(&self, column_name: &str) -> Option<DataType> {
        let hit = |patterns: &[String]| self.matches_any(column_name, patterns);

        if hit(&self.boolean_patterns) {
            Some(DataType::Boolean)
        } else if hit(&self.date_patterns) {
            Some(DataType::Date)
        } else if hit(&self.numeric_patterns) {
            Some(DataType::Float)
        } else if hit(&self.text_patterns) {
            Some(DataType::String)
        } else {
            None
        }
    }

    fn classify_by_content(&self, samples: &[Value]) -> DataType {
        let present: Vec<&Value> = samples.iter().filter(|v| !v.is_missing()).collect();
        if present.is_empty() {
            return DataType::String;
        }

        let total = present.len() as f64;
        let share = |predicate: fn(&Value) -> bool| {
            present.iter().filter(|v| predicate(**v)).count() as f64 / total
        };

        if share(|v| matches!(v, Value::Boolean(_))) >= self.content_threshold {
            DataType::Boolean
        } else if share(is_integral) >= self.content_threshold {
            DataType::Integer
        } else if share(is_numeric) >= self.content_threshold {
            DataType::Float
        } else if share(is_date) >= self.content_threshold {
            DataType::Date
        } else {
            DataType::String
        }
    }
}

/// [`ClassifierRules::classify`] with the default rules.
pub fn classify(column_name: &str, samples: &[Value]) -> ColumnConfig {
    ClassifierRules::default().classify(column_name, samples)
}

/// More than one word, unless the last word marks an identifier (`Product ID`).
fn is_multi_word_name(column_name: &str) -> bool {
    let words: Vec<&str> = column_name.split_whitespace().collect();
    match words.last() {
        Some(last) if words.len() > 1 => !IDENTIFIER_TOKENS.contains(&last.to_lowercase().as_str()),
        _ => false,
    }
}

fn is_integral(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Float(f) => f.is_finite() && f.fract() == 0.0,
        Value::Text(s) | Value::Category(s) => parse_number(s).is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Float(f) => f.is_finite(),
        Value::Text(s) | Value::Category(s) => parse_number(s).is_some(),
        _ => false,
    }
}

fn is_date(value: &Value) -> bool {
    match value {
        Value::DateTime(_) => true,
        Value::Text(s) | Value::Category(s) => parse_datetime(s).is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn texts(values: &[&str]) -> Vec<Value> {
        values.iter().map(|v| Value::from(*v)).collect()
    }

    #[test]
    fn test_boolean_name_rule() {
        let config = classify("Is Active", &texts(&["yes", "no"]));
        assert_eq!(config.target_type, DataType::Boolean);
        assert_eq!(config.word_count, Some(WordCount::Disabled));
    }

    #[test]
    fn test_text_name_rule_enables_word_count() {
        let config = classify("Product Description", &texts(&["a b", "c"]));
        assert_eq!(config.target_type, DataType::String);
        assert_eq!(config.word_count, Some(WordCount::Default));
    }

    #[test]
    fn test_identifier_name_is_plain_string() {
        let config = classify("Product ID", &texts(&["P-001", "P-002", "P-003"]));
        assert_eq!(config.target_type, DataType::String);
        assert_eq!(config.word_count, Some(WordCount::Disabled));
    }

    #[test]
    fn test_name_rule_order() {
        // "status" (boolean) is checked before "date"
        assert_eq!(classify("status_date", &[]).target_type, DataType::Boolean);
        assert_eq!(classify("created_at", &[]).target_type, DataType::Date);
        assert_eq!(classify("Unit Price", &[]).target_type, DataType::Float);
    }

    #[test]
    fn test_content_integers() {
        let samples = vec![Value::Integer(1), Value::from("2"), Value::Float(3.0)];
        assert_eq!(classify("qty_x", &samples).target_type, DataType::Integer);
    }

    #[test]
    fn test_content_floats() {
        let samples = texts(&["1.5", "2", "3.25", "4"]);
        assert_eq!(classify("weight", &samples).target_type, DataType::Float);
    }

    #[test]
    fn test_content_dates() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let samples = vec![Value::DateTime(dt), Value::from("2024-02-01"), Value::from("03/01/2024")];
        assert_eq!(classify("when", &samples).target_type, DataType::Date);
    }

    #[test]
    fn test_content_threshold_boundary() {
        // 9 of 10 integral: exactly 90%
        let mut samples: Vec<Value> = (0..9).map(Value::Integer).collect();
        samples.push(Value::from("n/a"));
        assert_eq!(classify("score", &samples).target_type, DataType::Integer);

        // 8 of 10: falls through to string
        samples[0] = Value::from("x");
        assert_eq!(classify("score", &samples).target_type, DataType::String);
    }

    #[test]
    fn test_missing_samples_are_ignored() {
        let samples = vec![Value::Integer(1), Value::Empty, Value::from("  "), Value::Integer(2)];
        assert_eq!(classify("score", &samples).target_type, DataType::Integer);
    }

    #[test]
    fn test_empty_sample_is_string() {
        assert_eq!(classify("misc", &[]).target_type, DataType::String);
    }

    #[test]
    fn test_native_booleans() {
        let samples = vec![Value::Boolean(true), Value::Boolean(false)];
        assert_eq!(classify("enabled", &samples).target_type, DataType::Boolean);
    }

    #[test]
    fn test_multi_word_string_gets_word_count() {
        let config = classify("Customer Feedback", &texts(&["great stuff", "meh"]));
        assert_eq!(config.target_type, DataType::String);
        assert_eq!(config.word_count, Some(WordCount::Default));
    }

    #[test]
    fn test_multi_word_numeric_has_no_word_count() {
        let config = classify("Order Total", &texts(&["1", "2"]));
        assert_eq!(config.target_type, DataType::Integer);
        assert_eq!(config.word_count, Some(WordCount::Disabled));
    }

    #[test]
    fn test_word_count_follows_resolved_type() {
        let rules = ClassifierRules::default();
        assert_eq!(rules.word_count_for("Customer Feedback", DataType::Integer), WordCount::Disabled);
        assert_eq!(rules.word_count_for("Order Total", DataType::String), WordCount::Default);
        assert_eq!(rules.word_count_for("Notes", DataType::String), WordCount::Default);
        assert_eq!(rules.word_count_for("Notes", DataType::Category), WordCount::Disabled);
        assert_eq!(rules.word_count_for("Product ID", DataType::String), WordCount::Disabled);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let samples = texts(&["1", "x", "2024-01-01"]);
        assert_eq!(classify("Mixed Bag", &samples), classify("Mixed Bag", &samples));
    }

    #[test]
    fn test_custom_threshold() {
        let rules = ClassifierRules { content_threshold: 0.5, ..Default::default() };
        let samples = texts(&["1", "2", "x"]);
        assert_eq!(rules.classify("score", &samples).target_type, DataType::Integer);
    }
}
