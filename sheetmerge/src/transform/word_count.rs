//! Word-count feature extraction.
//!
//! A column configured for word counting gets a derived
//! `{column}_word_count` column. Words are whitespace-separated tokens,
//! filtered by index range, length bounds and character sets.

use serde::{Deserialize, Serialize};

use crate::models::Value;

/// Filter applied before counting words. All filters apply together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WordCountSpec {
    /// Minimum word length in characters (inclusive).
    #[serde(default)]
    pub min_length: usize,

    /// Maximum word length in characters (inclusive). Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// First word index considered (zero-based).
    #[serde(default)]
    pub start: usize,

    /// Index one past the last word considered. End of text when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,

    /// A word counts only if every character is in this set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_chars: Option<String>,

    /// A word is discarded if it contains any of these characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_chars: Option<String>,
}

impl WordCountSpec {
    /// Check bounds. `start >= end` is legal and selects nothing.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_length {
            if self.min_length > max {
                return Err(format!(
                    "min_length ({}) is greater than max_length ({})",
                    self.min_length, max
                ));
            }
        }
        Ok(())
    }

    /// Count the words of `text` that pass every filter.
    pub fn count(&self, text: &str) -> usize {
        let words: Vec<&str> = text.split_whitespace().collect();
        let end = self.end.unwrap_or(words.len()).min(words.len());
        if self.start >= end {
            return 0;
        }

        words[self.start..end]
            .iter()
            .filter(|word| self.accepts(word))
            .count()
    }

    /// Count words in the string form of a cell. Missing cells count 0.
    pub fn count_value(&self, value: &Value) -> usize {
        value.as_string().map(|s| self.count(&s)).unwrap_or(0)
    }

    fn accepts(&self, word: &str) -> bool {
        let length = word.chars().count();
        if length < self.min_length {
            return false;
        }
        if self.max_length.is_some_and(|max| length > max) {
            return false;
        }
        if let Some(allowed) = &self.allowed_chars {
            if !word.chars().all(|c| allowed.contains(c)) {
                return false;
            }
        }
        if let Some(excluded) = &self.exclude_chars {
            if word.chars().any(|c| excluded.contains(c)) {
                return false;
            }
        }
        true
    }
}

/// Word-count directive of a column.
///
/// In configuration documents this is `false`, `true` or a
/// [`WordCountSpec`] object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WordCountDocument", into = "WordCountDocument")]
pub enum WordCount {
    Disabled,
    /// Count every word.
    Default,
    Custom(WordCountSpec),
}

impl WordCount {
    /// Effective filter, `None` when counting is off.
    pub fn spec(&self) -> Option<WordCountSpec> {
        match self {
            WordCount::Disabled => None,
            WordCount::Default => Some(WordCountSpec::default()),
            WordCount::Custom(spec) => Some(spec.clone()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, WordCount::Disabled)
    }
}

/// On-disk shape of [`WordCount`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WordCountDocument {
    Flag(bool),
    Spec(WordCountSpec),
}

impl TryFrom<WordCountDocument> for WordCount {
    type Error = String;

    fn try_from(doc: WordCountDocument) -> Result<Self, Self::Error> {
        match doc {
            WordCountDocument::Flag(false) => Ok(WordCount::Disabled),
            WordCountDocument::Flag(true) => Ok(WordCount::Default),
            WordCountDocument::Spec(spec) => {
                spec.validate()?;
                Ok(WordCount::Custom(spec))
            }
        }
    }
}

impl From<WordCount> for WordCountDocument {
    fn from(value: WordCount) -> Self {
        match value {
            WordCount::Disabled => WordCountDocument::Flag(false),
            WordCount::Default => WordCountDocument::Flag(true),
            WordCount::Custom(spec) => WordCountDocument::Spec(spec),
        }
    }
}
