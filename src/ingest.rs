use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AnalyticsConfig;
use crate::encoding::{self, TextEncoding};
use crate::error::{AnalyticsError, ParseError, Result};
use crate::models::Record;
use crate::table::Table;

/// Candidates in tie-break order.
pub const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Column rules the ingestor resolves once per upload.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    pub name_aliases: Vec<String>,
    pub placeholder_markers: Vec<String>,
    pub computed_columns: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&AnalyticsConfig::default())
    }
}

impl From<&AnalyticsConfig> for IngestOptions {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            name_aliases: config.name_aliases.clone(),
            placeholder_markers: config.placeholder_markers.clone(),
            computed_columns: config.computed_columns.clone(),
        }
    }
}

impl IngestOptions {
    fn is_name_alias(&self, header: &str) -> bool {
        self.name_aliases.iter().any(|alias| alias == header)
    }

    fn is_computed(&self, header: &str) -> bool {
        self.computed_columns.iter().any(|column| column == header)
    }

    fn is_placeholder(&self, name: &str) -> bool {
        self.placeholder_markers
            .iter()
            .any(|marker| !marker.is_empty() && name.contains(marker.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    ColumnCount { expected: usize, found: usize },
    Placeholder,
    NoValidScore,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ColumnCount { expected, found } => {
                write!(f, "expected {expected} columns, found {found}")
            }
            SkipReason::Placeholder => f.write_str("not a student row"),
            SkipReason::NoValidScore => f.write_str("no valid score"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based line in the source text.
    pub line: u64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ingestion {
    pub table: Table,
    pub delimiter: char,
    pub encoding: TextEncoding,
    pub skipped: Vec<SkippedRow>,
}

/// Picks the candidate splitting the first three non-blank lines into the most columns.
pub fn detect_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(3)
        .collect();

    let mut best = DELIMITERS[0];
    let mut best_columns = 0;
    for candidate in DELIMITERS {
        let columns = sample
            .iter()
            .map(|line| line.split(char::from(candidate)).count())
            .max()
            .unwrap_or(0);
        if columns > best_columns {
            best = candidate;
            best_columns = columns;
        }
    }
    best
}

/// Reads the longest numeric prefix of `field`, so "85分" yields 85.
pub fn parse_score(field: &str) -> Option<f64> {
    let field = field.trim();
    (1..=field.len())
        .rev()
        .filter(|&end| field.is_char_boundary(end))
        .find_map(|end| field[..end].parse::<f64>().ok().filter(|v| v.is_finite()))
}

pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

/// One record of the upload: the line it starts on and its trimmed fields.
#[derive(Debug, Clone, PartialEq)]
struct RawRow {
    line: u64,
    fields: Vec<String>,
}

/// Splits `text` into rows of fields.
///
/// Every unescaped `"` toggles the quoted state wherever it appears in a field, and
/// `""` inside quotes is a literal quote. Delimiters and newlines inside quotes belong
/// to the field. Fields are trimmed after splitting; whitespace-only lines are dropped.
fn split_rows(text: &str, delimiter: char) -> Vec<RawRow> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_content = false;
    let mut line = 1;
    let mut start = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == delimiter || !c.is_whitespace() {
            has_content = true;
        }
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => in_quotes = !in_quotes,
            '\n' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
                let row = std::mem::take(&mut fields);
                if has_content {
                    rows.push(RawRow { line: start, fields: row });
                }
                has_content = false;
                line += 1;
                start = line;
            }
            c if c == delimiter && !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            c => {
                if c == '\n' {
                    line += 1;
                }
                current.push(c);
            }
        }
    }
    if has_content {
        fields.push(current.trim().to_string());
        rows.push(RawRow { line: start, fields });
    }
    rows
}

/// Parses CSV text into a table, skipping rows that are not student data.
pub fn parse_csv(text: &str, options: &IngestOptions) -> std::result::Result<Ingestion, ParseError> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let non_blank = text.lines().filter(|line| !line.trim().is_empty()).count();
    if non_blank < 2 {
        return Err(ParseError::TooFewLines);
    }

    let delimiter = detect_delimiter(text);
    debug!("Detected delimiter {:?}", char::from(delimiter));

    let mut rows = split_rows(text, char::from(delimiter)).into_iter();
    let header = rows.next().ok_or(ParseError::TooFewLines)?;
    let headers = header.fields;

    let name_index = headers
        .iter()
        .position(|h| options.is_name_alias(h))
        .ok_or_else(|| ParseError::MissingNameColumn(options.name_aliases.join(", ")))?;

    let mut columns: Vec<(usize, String)> = Vec::new();
    for (index, header) in headers.iter().enumerate() {
        if options.is_name_alias(header) {
            continue;
        }
        if header.is_empty() {
            warn!("Ignoring unnamed column {}", index + 1);
            continue;
        }
        if options.is_computed(header) {
            debug!("Ignoring computed column {header}");
            continue;
        }
        if columns.iter().any(|(_, subject)| subject == header) {
            warn!("Ignoring duplicate subject column {header}");
            continue;
        }
        columns.push((index, header.clone()));
    }
    if columns.is_empty() {
        return Err(ParseError::NoSubjectColumns);
    }

    let mut records = Vec::new();
    let mut skipped = Vec::new();
    for RawRow { line, fields: row } in rows {
        let reason = if row.len() != headers.len() {
            Some(SkipReason::ColumnCount {
                expected: headers.len(),
                found: row.len(),
            })
        } else {
            let name = row[name_index].as_str();
            if name.is_empty() || options.is_placeholder(name) {
                Some(SkipReason::Placeholder)
            } else if !columns
                .iter()
                .any(|(index, _)| parse_score(&row[*index]).is_some())
            {
                Some(SkipReason::NoValidScore)
            } else {
                None
            }
        };

        if let Some(reason) = reason {
            warn!("Skipping line {line}: {reason}");
            skipped.push(SkippedRow { line, reason });
            continue;
        }

        let mut record = Record::new(row[name_index].as_str());
        for (index, subject) in &columns {
            let score = parse_score(&row[*index]).map(clamp_score).unwrap_or(0.0);
            record.scores.insert(subject.clone(), score);
        }
        records.push(record);
    }

    if records.is_empty() {
        return Err(ParseError::NoValidData);
    }

    let subjects: Vec<String> = columns.into_iter().map(|(_, subject)| subject).collect();
    info!(
        "Parsed {} students across {} subjects ({} rows skipped)",
        records.len(),
        subjects.len(),
        skipped.len()
    );

    Ok(Ingestion {
        table: Table::from_parts(headers[name_index].clone(), subjects, records),
        delimiter: char::from(delimiter),
        encoding: TextEncoding::Utf8,
        skipped,
    })
}

/// Decodes raw upload bytes and parses them.
pub fn parse_bytes(bytes: &[u8], options: &IngestOptions) -> std::result::Result<Ingestion, ParseError> {
    let (text, encoding) = encoding::decode(bytes);
    let mut ingestion = parse_csv(&text, options)?;
    ingestion.encoding = encoding;
    Ok(ingestion)
}

pub async fn load_file(path: &Path, options: &IngestOptions) -> Result<Ingestion> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| AnalyticsError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parse_bytes(&bytes, options)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> std::result::Result<Ingestion, ParseError> {
        parse_csv(text, &IngestOptions::default())
    }

    #[test]
    fn clamps_out_of_range_scores() {
        let ingestion = parse("name,math\nA,101\nB,-5\n").unwrap();
        let records = ingestion.table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].score("math"), 100.0);
        assert_eq!(records[1].score("math"), 0.0);
    }

    #[test]
    fn detects_semicolon() {
        let ingestion = parse("姓名;数学;语文\n张三;90;85\n").unwrap();
        assert_eq!(ingestion.delimiter, ';');
        assert_eq!(ingestion.table.subjects(), ["数学".to_string(), "语文".to_string()]);
        assert_eq!(ingestion.table.name_header(), "姓名");
    }

    #[test]
    fn detects_tab_and_prefers_comma_on_tie() {
        assert_eq!(detect_delimiter("name\tmath\tart\nA\t1\t2"), b'\t');
        assert_eq!(detect_delimiter("name\nA"), b',');
        assert_eq!(detect_delimiter("name,math;art"), b',');
    }

    #[test]
    fn drops_rows_with_wrong_column_count() {
        let ingestion = parse("name,math,eng\nA,90,80\nB,70\nC,60,65,1\n").unwrap();
        assert_eq!(ingestion.table.len(), 1);
        assert_eq!(ingestion.skipped.len(), 2);
        assert_eq!(
            ingestion.skipped[0].reason,
            SkipReason::ColumnCount { expected: 3, found: 2 }
        );
        assert_eq!(ingestion.skipped[0].line, 3);
    }

    #[test]
    fn skips_placeholder_and_scoreless_rows() {
        let text = "姓名,数学\n说明：请填写成绩,\n张三,88\n李四,缺考\n,77\n";
        let ingestion = parse(text).unwrap();
        assert_eq!(ingestion.table.len(), 1);
        assert_eq!(ingestion.table.records()[0].name, "张三");
        let reasons: Vec<_> = ingestion.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![SkipReason::Placeholder, SkipReason::NoValidScore, SkipReason::Placeholder]
        );
    }

    #[test]
    fn unparsable_cells_default_to_zero() {
        let ingestion = parse("name,math,eng\nA,90,absent\n").unwrap();
        assert_eq!(ingestion.table.records()[0].score("eng"), 0.0);
    }

    #[test]
    fn quoted_fields_keep_delimiters_and_quotes() {
        let text = "name,math\n\"Lee, Avery\",91\n\"Jules \"\"JM\"\" Moreno\",72\n";
        let ingestion = parse(text).unwrap();
        let names: Vec<_> = ingestion.table.records().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["Lee, Avery".to_string(), "Jules \"JM\" Moreno".to_string()]);
    }

    #[test]
    fn quotes_after_leading_space_still_group() {
        let ingestion = parse("name, math, eng\nA, \"91\", \"80\"\nB, 70, 60\n").unwrap();
        assert!(ingestion.skipped.is_empty());
        let records = ingestion.table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].score("math"), 91.0);
        assert_eq!(records[0].score("eng"), 80.0);

        let ingestion = parse("math, name\n90, \"Lee, Avery\"\n80, Bo\n").unwrap();
        let names: Vec<_> = ingestion.table.records().iter().map(|r| r.name.clone()).collect();
        assert_eq!(names, vec!["Lee, Avery".to_string(), "Bo".to_string()]);
        assert_eq!(ingestion.table.records()[0].score("math"), 90.0);
    }

    #[test]
    fn quote_state_toggles_mid_field() {
        let rows = split_rows("A \"x,y\" B,90\n", ',');
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields, vec!["A x,y B".to_string(), "90".to_string()]);

        let rows = split_rows("\"say \"\"hi\"\"\";a\"\"b\n", ';');
        assert_eq!(rows[0].fields, vec!["say \"hi\"".to_string(), "ab".to_string()]);
    }

    #[test]
    fn quoted_newline_stays_in_field_and_lines_keep_counting() {
        let rows = split_rows("name,note\n\"A\",\"two\nlines\"\n\nB,x\n", ',');
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].fields[1], "two\nlines");
        assert_eq!(rows[1].line, 2);
        assert_eq!(rows[2].line, 5);
    }

    #[test]
    fn delimiter_only_rows_are_reported() {
        let ingestion = parse("name,math\n,\nA,90\n").unwrap();
        assert_eq!(ingestion.table.len(), 1);
        assert_eq!(
            ingestion.skipped,
            vec![SkippedRow { line: 2, reason: SkipReason::Placeholder }]
        );

        let ingestion = parse("name\tmath\n\t\nA\t90\n").unwrap();
        assert_eq!(ingestion.skipped.len(), 1);
        assert_eq!(ingestion.skipped[0].reason, SkipReason::Placeholder);
    }

    #[test]
    fn strips_bom_and_crlf() {
        let ingestion = parse("\u{FEFF}Name,Math\r\nA,88\r\n\r\nB,77\r\n").unwrap();
        assert_eq!(ingestion.table.name_header(), "Name");
        assert_eq!(ingestion.table.len(), 2);
    }

    #[test]
    fn name_column_need_not_be_first() {
        let ingestion = parse("math,name,eng\n90,A,80\n").unwrap();
        assert_eq!(ingestion.table.subjects(), ["math".to_string(), "eng".to_string()]);
        assert_eq!(ingestion.table.records()[0].name, "A");
    }

    #[test]
    fn computed_columns_are_ignored() {
        let ingestion = parse("name,math,total,average,rank\nA,90,90,90,1\n").unwrap();
        assert_eq!(ingestion.table.subjects(), ["math".to_string()]);
    }

    #[test]
    fn too_few_lines() {
        assert_eq!(parse("name,math\n\n   \n").unwrap_err(), ParseError::TooFewLines);
        assert_eq!(parse("").unwrap_err(), ParseError::TooFewLines);
    }

    #[test]
    fn nothing_valid_is_an_error() {
        assert_eq!(
            parse("name,math\nA,x\nB\n").unwrap_err(),
            ParseError::NoValidData
        );
    }

    #[test]
    fn missing_name_column() {
        assert!(matches!(
            parse("student,math\nA,90\n").unwrap_err(),
            ParseError::MissingNameColumn(_)
        ));
    }

    #[test]
    fn custom_aliases_are_honoured() {
        let options = IngestOptions {
            name_aliases: vec!["student".to_string()],
            ..IngestOptions::default()
        };
        let ingestion = parse_csv("student,math\nA,90\n", &options).unwrap();
        assert_eq!(ingestion.table.name_header(), "student");
    }

    #[test]
    fn parse_score_reads_numeric_prefix() {
        assert_eq!(parse_score(" 85 "), Some(85.0));
        assert_eq!(parse_score("85分"), Some(85.0));
        assert_eq!(parse_score("92.5%"), Some(92.5));
        assert_eq!(parse_score("NaN"), None);
        assert_eq!(parse_score("abc"), None);
        assert_eq!(parse_score(""), None);
    }
}
