use serde::Serialize;
use tracing::info;

use crate::config::{DEFAULT_NAME_ALIASES, DEFAULT_SUBJECTS};
use crate::error::ValidationError;
use crate::models::Record;

pub const MAX_SUBJECT_NAME_LEN: usize = 10;

/// Students and subjects in column order.
///
/// Every record carries a score for every subject: mutations backfill new
/// subjects with 0 and reject scores for subjects the table does not know.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    name_header: String,
    subjects: Vec<String>,
    records: Vec<Record>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            name_header: DEFAULT_NAME_ALIASES[0].to_string(),
            subjects: DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect(),
            records: Vec::new(),
        }
    }
}

impl Table {
    pub fn new(name_header: impl Into<String>, subjects: Vec<String>) -> Result<Self, ValidationError> {
        if subjects.is_empty() {
            return Err(ValidationError::LastSubject);
        }
        for (index, subject) in subjects.iter().enumerate() {
            if subject.trim().is_empty() {
                return Err(ValidationError::EmptySubjectName);
            }
            if subjects[..index].contains(subject) {
                return Err(ValidationError::DuplicateSubject(subject.clone()));
            }
        }
        Ok(Self {
            name_header: name_header.into(),
            subjects,
            records: Vec::new(),
        })
    }

    /// Builds an empty table, applying the manual-entry rules to each subject name.
    pub fn with_subjects(
        name_header: impl Into<String>,
        subjects: &[String],
        max_len: usize,
    ) -> Result<Self, ValidationError> {
        let mut table = Self {
            name_header: name_header.into(),
            subjects: Vec::new(),
            records: Vec::new(),
        };
        for subject in subjects {
            table.add_subject_limited(subject, max_len)?;
        }
        if table.subjects.is_empty() {
            return Err(ValidationError::LastSubject);
        }
        Ok(table)
    }

    /// Assembles a table from rows the ingestor already normalised.
    pub(crate) fn from_parts(name_header: String, subjects: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            name_header,
            subjects,
            records,
        }
    }

    pub fn name_header(&self) -> &str {
        &self.name_header
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every student's score for `subject`, in record order.
    pub fn column(&self, subject: &str) -> Vec<f64> {
        self.records.iter().map(|record| record.score(subject)).collect()
    }

    pub fn add_subject(&mut self, name: &str) -> Result<(), ValidationError> {
        self.add_subject_limited(name, MAX_SUBJECT_NAME_LEN)
    }

    pub fn add_subject_limited(&mut self, name: &str, max_len: usize) -> Result<(), ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptySubjectName);
        }
        if name.chars().count() > max_len {
            return Err(ValidationError::SubjectNameTooLong {
                name: name.to_string(),
                max: max_len,
            });
        }
        if self.subjects.iter().any(|subject| subject == name) {
            return Err(ValidationError::DuplicateSubject(name.to_string()));
        }

        self.subjects.push(name.to_string());
        for record in &mut self.records {
            record.scores.insert(name.to_string(), 0.0);
        }
        info!("Added subject {name}");
        Ok(())
    }

    pub fn remove_subject(&mut self, index: usize) -> Result<String, ValidationError> {
        if self.subjects.len() <= 1 {
            return Err(ValidationError::LastSubject);
        }
        if index >= self.subjects.len() {
            return Err(ValidationError::SubjectIndexOutOfRange {
                index,
                len: self.subjects.len(),
            });
        }

        let removed = self.subjects.remove(index);
        for record in &mut self.records {
            record.scores.remove(&removed);
        }
        info!("Removed subject {removed}");
        Ok(removed)
    }

    /// Appends a student and returns its index.
    pub fn add_student(&mut self, record: Record) -> Result<usize, ValidationError> {
        let record = self.normalize(record)?;
        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    /// Appends a batch of manually entered students; nothing is added unless all are valid.
    pub fn append_students(&mut self, records: Vec<Record>) -> Result<usize, ValidationError> {
        let normalized = records
            .into_iter()
            .map(|record| self.normalize(record))
            .collect::<Result<Vec<_>, _>>()?;
        let added = normalized.len();
        self.records.extend(normalized);
        info!("Appended {added} students");
        Ok(added)
    }

    pub fn update_student(&mut self, index: usize, record: Record) -> Result<(), ValidationError> {
        if index >= self.records.len() {
            return Err(ValidationError::StudentIndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        self.records[index] = self.normalize(record)?;
        Ok(())
    }

    pub fn remove_student(&mut self, index: usize) -> Result<Record, ValidationError> {
        if index >= self.records.len() {
            return Err(ValidationError::StudentIndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        Ok(self.records.remove(index))
    }

    /// Drops all students and restores `default_subjects`.
    pub fn reset(&mut self, default_subjects: &[String]) {
        self.records.clear();
        self.subjects = if default_subjects.is_empty() {
            DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect()
        } else {
            default_subjects.to_vec()
        };
        info!("Table reset to {} default subjects", self.subjects.len());
    }

    fn normalize(&self, record: Record) -> Result<Record, ValidationError> {
        let name = record.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyStudentName);
        }

        if let Some(unknown) = record
            .scores
            .keys()
            .find(|subject| !self.subjects.contains(subject))
        {
            return Err(ValidationError::UnknownSubject(unknown.clone()));
        }

        let mut normalized = Record::new(name);
        for subject in &self.subjects {
            let score = record.score(subject);
            if !score.is_finite() || !(0.0..=100.0).contains(&score) {
                return Err(ValidationError::ScoreOutOfRange {
                    subject: subject.clone(),
                    score,
                });
            }
            normalized.scores.insert(subject.clone(), score);
        }
        Ok(normalized)
    }

    /// Describes rows that break the table rules, numbered from 1.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.records.is_empty() {
            issues.push("table is empty".to_string());
            return issues;
        }

        for (index, record) in self.records.iter().enumerate() {
            let row = index + 1;
            if record.name.trim().is_empty() {
                issues.push(format!("row {row}: student name is empty"));
            }
            for subject in &self.subjects {
                match record.scores.get(subject) {
                    None => issues.push(format!("row {row}: missing score for {subject}")),
                    Some(score) if !score.is_finite() || !(0.0..=100.0).contains(score) => {
                        issues.push(format!("row {row}: invalid {subject} score ({score})"))
                    }
                    Some(_) => {}
                }
            }
        }
        issues
    }
}
