//! Transformation module.
//!
//! This module turns raw sheets into the consolidated table:
//! - Word count: word counting with length and character filters
//! - Coerce: value conversion to a target type, with sentinels
//! - Classifier: column type inference from name and content
//! - Normalizer: one sheet to typed columns plus derived columns
//! - Pipeline: multi-sheet consolidation

pub mod classifier;
pub mod coerce;
pub mod normalizer;
pub mod pipeline;
pub mod word_count;

pub use classifier::{classify, ClassifierRules};
pub use coerce::coerce;
pub use normalizer::{normalize, NormalizedSheet, ResolvedColumn};
pub use pipeline::*;
pub use word_count::{WordCount, WordCountSpec};
