use std::path::PathBuf;

use thiserror::Error;

/// Failures that reject a whole CSV upload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than two non-blank lines: a header and at least one data row are required.
    #[error("CSV needs a header row and at least one data row")]
    TooFewLines,

    /// No header matched any of the configured name-column aliases.
    #[error("no name column found in header (expected one of: {0})")]
    MissingNameColumn(String),

    /// Only the name column (or ignored columns) appeared in the header.
    #[error("no subject columns found in header")]
    NoSubjectColumns,

    /// Every data row was skipped during validation.
    #[error("no valid data")]
    NoValidData,
}

/// Raised by the primary text decoder; answered by the secondary decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingFallbackError {
    #[error("input is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },
}

/// Manual-entry constraint violations. The table is left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("subject name must not be empty")]
    EmptySubjectName,

    #[error("subject name {name:?} is longer than {max} characters")]
    SubjectNameTooLong { name: String, max: usize },

    #[error("subject {0:?} already exists")]
    DuplicateSubject(String),

    #[error("at least one subject must remain")]
    LastSubject,

    #[error("unknown subject {0:?}")]
    UnknownSubject(String),

    #[error("subject index {index} out of range ({len} subjects)")]
    SubjectIndexOutOfRange { index: usize, len: usize },

    #[error("student index {index} out of range ({len} students)")]
    StudentIndexOutOfRange { index: usize, len: usize },

    #[error("student name must not be empty")]
    EmptyStudentName,

    #[error("score {score} for {subject:?} is outside 0-100")]
    ScoreOutOfRange { subject: String, score: f64 },
}

/// Umbrella error for library entry points that touch files or configuration.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_messages() {
        assert_eq!(ParseError::NoValidData.to_string(), "no valid data");
        let err = ParseError::MissingNameColumn("姓名, name".to_string());
        assert!(err.to_string().contains("姓名, name"));
    }

    #[test]
    fn validation_error_names_the_subject() {
        let err = ValidationError::SubjectNameTooLong {
            name: "Computational Linguistics".to_string(),
            max: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("Computational Linguistics"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn file_read_carries_path() {
        let err = AnalyticsError::FileRead {
            path: PathBuf::from("/tmp/scores.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/scores.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn parse_error_converts_into_umbrella() {
        let err: AnalyticsError = ParseError::TooFewLines.into();
        assert!(matches!(err, AnalyticsError::Parse(ParseError::TooFewLines)));
    }
}
