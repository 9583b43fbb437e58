//! Configuration templates.
//!
//! Generates a starting configuration document from the header of a
//! sheet, to be edited by hand and passed back with `--config`.

use chrono::Local;
use std::path::{Path, PathBuf};

use super::{ColumnConfig, ColumnConfigSet};
use crate::error::ConfigResult;
use crate::models::{DataType, RawSheet};
use crate::transform::classifier::ClassifierRules;
use crate::transform::word_count::WordCount;

/// Builder for a template document.
#[derive(Debug, Clone)]
pub struct ConfigTemplate {
    /// Use the classifier's suggestion instead of `auto`/`false`.
    pub suggest: bool,
    pub rules: ClassifierRules,
    pub sample_rows: usize,
}

impl Default for ConfigTemplate {
    fn default() -> Self {
        Self {
            suggest: false,
            rules: ClassifierRules::default(),
            sample_rows: 100,
        }
    }
}

impl ConfigTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suggest(mut self, suggest: bool) -> Self {
        self.suggest = suggest;
        self
    }

    /// One entry per header column, in header order.
    pub fn build(&self, sheet: &RawSheet) -> ColumnConfigSet {
        sheet
            .header
            .iter()
            .enumerate()
            .map(|(position, column)| {
                let config = if self.suggest {
                    let samples = sheet.sample(position, self.sample_rows);
                    self.rules.classify(column, &samples)
                } else {
                    ColumnConfig::new(DataType::Auto).with_word_count(WordCount::Disabled)
                };
                (column.clone(), config.with_description(format!("Column: {}", column)))
            })
            .collect()
    }

    /// Build and write the template. Returns the path written.
    pub fn write(&self, sheet: &RawSheet, path: Option<&Path>) -> ConfigResult<PathBuf> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_template_path);
        self.build(sheet).save(&path)?;
        Ok(path)
    }
}

/// `column_config_template_<YYYYmmdd_HHMMSS>.json` in the current directory.
pub fn default_template_path() -> PathBuf {
    PathBuf::from(format!(
        "column_config_template_{}.json",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;
    use tempfile::tempdir;

    fn sheet() -> RawSheet {
        RawSheet::new(
            0,
            "Sales",
            vec!["Region".into(), "Unit Price".into(), "Comments".into()],
            vec![
                vec![Value::from("North"), Value::Float(9.5), Value::from("late delivery")],
                vec![Value::from("South"), Value::Float(4.0), Value::Empty],
            ],
        )
    }

    #[test]
    fn test_plain_template() {
        let set = ConfigTemplate::new().build(&sheet());

        let names: Vec<&str> = set.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Region", "Unit Price", "Comments"]);

        let region = set.get("Region").unwrap();
        assert_eq!(region.target_type, DataType::Auto);
        assert_eq!(region.word_count, Some(WordCount::Disabled));
        assert_eq!(region.description.as_deref(), Some("Column: Region"));
    }

    #[test]
    fn test_suggested_template() {
        let set = ConfigTemplate::new().suggest(true).build(&sheet());
        assert_eq!(set.get("Unit Price").unwrap().target_type, DataType::Float);
        assert_eq!(set.get("Comments").unwrap().word_count, Some(WordCount::Default));
    }

    #[test]
    fn test_write_round_trips_through_loader() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("template.json");

        let written = ConfigTemplate::new().write(&sheet(), Some(&path)).unwrap();
        assert_eq!(written, path);

        let reloaded = ColumnConfigSet::load(&path).unwrap();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.get("Comments").unwrap().target_type, DataType::Auto);
    }

    #[test]
    fn test_default_template_path_shape() {
        let name = default_template_path().to_string_lossy().to_string();
        assert!(name.starts_with("column_config_template_"));
        assert!(name.ends_with(".json"));
        // column_config_template_ + YYYYmmdd_HHMMSS + .json
        assert_eq!(name.len(), "column_config_template_".len() + 15 + ".json".len());
    }
}
