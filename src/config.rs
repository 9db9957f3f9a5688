use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

pub const DEFAULT_NAME_ALIASES: [&str; 6] = ["姓名", "name", "学生姓名", "Name", "NAME", "学生"];
pub const DEFAULT_PLACEHOLDER_MARKERS: [&str; 3] = ["说明", "当前", "支持"];
pub const DEFAULT_COMPUTED_COLUMNS: [&str; 6] = ["total", "average", "rank", "总分", "平均分", "排名"];
pub const DEFAULT_SUBJECTS: [&str; 5] = ["语文", "数学", "英语", "物理", "化学"];

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Tunables for ingestion, manual entry and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Header spellings recognised as the student-name column (case-sensitive).
    pub name_aliases: Vec<String>,
    /// Substrings marking instructional rows left behind in template files.
    pub placeholder_markers: Vec<String>,
    /// Columns produced by export; dropped on import.
    pub computed_columns: Vec<String>,
    /// Subject list restored by a reset.
    pub default_subjects: Vec<String>,
    pub max_subject_name_len: usize,
    /// How many students the top/bottom performer lists hold.
    pub top_n: usize,
    /// Points below the subject average that flag a subject for attention.
    pub attention_margin: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            name_aliases: to_strings(&DEFAULT_NAME_ALIASES),
            placeholder_markers: to_strings(&DEFAULT_PLACEHOLDER_MARKERS),
            computed_columns: to_strings(&DEFAULT_COMPUTED_COLUMNS),
            default_subjects: to_strings(&DEFAULT_SUBJECTS),
            max_subject_name_len: 10,
            top_n: 5,
            attention_margin: 10.0,
        }
    }
}

impl AnalyticsConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AnalyticsError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Loads `path` when given, otherwise falls back to the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name_aliases.iter().all(|alias| alias.trim().is_empty()) {
            return Err(AnalyticsError::Config(
                "name_aliases must contain at least one alias".to_string(),
            ));
        }
        if self.default_subjects.is_empty() {
            return Err(AnalyticsError::Config(
                "default_subjects must not be empty".to_string(),
            ));
        }
        if self.max_subject_name_len == 0 {
            return Err(AnalyticsError::Config(
                "max_subject_name_len must be positive".to_string(),
            ));
        }
        if !self.attention_margin.is_finite() || self.attention_margin < 0.0 {
            return Err(AnalyticsError::Config(
                "attention_margin must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classroom_template() {
        let config = AnalyticsConfig::default();
        assert!(config.name_aliases.contains(&"姓名".to_string()));
        assert_eq!(config.default_subjects.len(), 5);
        assert_eq!(config.max_subject_name_len, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AnalyticsConfig::from_json(r#"{"top_n": 3}"#).unwrap();
        assert_eq!(config.top_n, 3);
        assert_eq!(config.attention_margin, 10.0);
        assert_eq!(config.name_aliases.len(), 6);
    }

    #[test]
    fn rejects_empty_alias_set() {
        let err = AnalyticsConfig::from_json(r#"{"name_aliases": []}"#).unwrap_err();
        assert!(matches!(err, AnalyticsError::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.json");
        std::fs::write(&path, r#"{"default_subjects": ["Math"]}"#).unwrap();
        let config = AnalyticsConfig::load_or_default(Some(path.as_path())).unwrap();
        assert_eq!(config.default_subjects, vec!["Math".to_string()]);
    }

    #[test]
    fn missing_file_is_file_read_error() {
        let err = AnalyticsConfig::load(Path::new("/nonexistent/analytics.json")).unwrap_err();
        assert!(matches!(err, AnalyticsError::FileRead { .. }));
    }
}
