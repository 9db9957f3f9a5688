use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// One student's row: a name plus a score per subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub name: String,
    pub scores: BTreeMap<String, f64>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scores: BTreeMap::new(),
        }
    }

    pub fn with_score(mut self, subject: impl Into<String>, score: f64) -> Self {
        self.scores.insert(subject.into(), score);
        self
    }

    /// Score for `subject`, 0 when the subject is absent.
    pub fn score(&self, subject: &str) -> f64 {
        self.scores.get(subject).copied().unwrap_or(0.0)
    }
}

/// Four-way band used for class statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeBand {
    Excellent,
    Good,
    Pass,
    Fail,
}

impl GradeBand {
    pub const ALL: [GradeBand; 4] = [
        GradeBand::Excellent,
        GradeBand::Good,
        GradeBand::Pass,
        GradeBand::Fail,
    ];

    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            GradeBand::Excellent
        } else if score >= 80.0 {
            GradeBand::Good
        } else if score >= 60.0 {
            GradeBand::Pass
        } else {
            GradeBand::Fail
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GradeBand::Excellent => "excellent (90-100)",
            GradeBand::Good => "good (80-89)",
            GradeBand::Pass => "pass (60-79)",
            GradeBand::Fail => "fail (<60)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 90.0 => LetterGrade::A,
            s if s >= 80.0 => LetterGrade::B,
            s if s >= 70.0 => LetterGrade::C,
            s if s >= 60.0 => LetterGrade::D,
            _ => LetterGrade::F,
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        };
        f.write_str(letter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandCount {
    pub count: usize,
    /// Percentage of the class, one decimal.
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStats {
    pub subject: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub std_dev: f64,
    pub variance: f64,
    pub excellent: BandCount,
    pub good: BandCount,
    pub pass: BandCount,
    pub fail: BandCount,
    /// Share of the class scoring 60 or more, one decimal.
    pub pass_rate: f64,
    pub top_student: String,
    pub bottom_student: String,
}

impl SubjectStats {
    pub fn band(&self, band: GradeBand) -> BandCount {
        match band {
            GradeBand::Excellent => self.excellent,
            GradeBand::Good => self.good,
            GradeBand::Pass => self.pass,
            GradeBand::Fail => self.fail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectGrade {
    pub subject: String,
    pub score: f64,
    pub grade: LetterGrade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRanking {
    pub name: String,
    /// Position of the record in the table it was ranked from.
    pub original_index: usize,
    pub total: f64,
    /// Total divided by subject count, one decimal.
    pub average: f64,
    pub rank: usize,
    pub grades: Vec<SubjectGrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRankEntry {
    pub name: String,
    pub original_index: usize,
    pub score: f64,
    pub grade: LetterGrade,
    pub rank: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
    Negligible,
}

impl CorrelationStrength {
    pub fn from_coefficient(r: f64) -> Self {
        let magnitude = r.abs();
        if magnitude >= 0.7 {
            CorrelationStrength::Strong
        } else if magnitude >= 0.5 {
            CorrelationStrength::Moderate
        } else if magnitude >= 0.3 {
            CorrelationStrength::Weak
        } else {
            CorrelationStrength::Negligible
        }
    }
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CorrelationStrength::Strong => "strong",
            CorrelationStrength::Moderate => "moderate",
            CorrelationStrength::Weak => "weak",
            CorrelationStrength::Negligible => "negligible",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectCorrelation {
    pub first: String,
    pub second: String,
    pub coefficient: f64,
    pub strength: CorrelationStrength,
}

/// Square, symmetric matrix of Pearson coefficients in subject order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub subjects: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, first: &str, second: &str) -> Option<f64> {
        let i = self.subjects.iter().position(|s| s == first)?;
        let j = self.subjects.iter().position(|s| s == second)?;
        Some(self.values[i][j])
    }

    /// Every unordered pair of distinct subjects, in column order.
    pub fn pairs(&self) -> Vec<SubjectCorrelation> {
        let mut pairs = Vec::new();
        for i in 0..self.subjects.len() {
            for j in (i + 1)..self.subjects.len() {
                let coefficient = self.values[i][j];
                pairs.push(SubjectCorrelation {
                    first: self.subjects[i].clone(),
                    second: self.subjects[j].clone(),
                    coefficient,
                    strength: CorrelationStrength::from_coefficient(coefficient),
                });
            }
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BandTotals {
    pub excellent: usize,
    pub good: usize,
    pub pass: usize,
    pub fail: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LetterDistribution {
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub d: usize,
    pub f: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassOverview {
    pub total_students: usize,
    pub subject_count: usize,
    /// Mean of student totals.
    pub class_average: f64,
    pub high_performers: usize,
    pub low_performers: usize,
    pub pass_rate: f64,
    pub lowest_total: f64,
    pub highest_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectAverage {
    pub subject: String,
    pub average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl fmt::Display for PerformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PerformanceLevel::Excellent => "excellent",
            PerformanceLevel::Good => "good",
            PerformanceLevel::Average => "average",
            PerformanceLevel::NeedsImprovement => "needs improvement",
        };
        f.write_str(label)
    }
}

/// Overall remark bucketed by a student's average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Remark {
    Maintain,
    ImproveWeakSubjects,
    StrengthenFundamentals,
    BroadImprovement,
}

impl fmt::Display for Remark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Remark::Maintain => "excellent overall, maintain current performance",
            Remark::ImproveWeakSubjects => "good results, improve weak subjects",
            Remark::StrengthenFundamentals => "strengthen fundamentals",
            Remark::BroadImprovement => "broad improvement needed across subjects",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectPerformance {
    pub subject: String,
    pub score: f64,
    pub grade: LetterGrade,
    pub subject_average: f64,
    pub difference: f64,
    pub percentile: u32,
    pub subject_rank: usize,
    pub level: PerformanceLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentReport {
    pub ranking: StudentRanking,
    pub performance: Vec<SubjectPerformance>,
    /// Subjects at 85 or above, best first.
    pub strengths: Vec<SubjectGrade>,
    /// Subjects below 70, worst first.
    pub weaknesses: Vec<SubjectGrade>,
    /// Subjects more than the attention margin below the subject average.
    pub needs_attention: Vec<String>,
    pub remark: Remark,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    pub overview: ClassOverview,
    pub subject_stats: Vec<SubjectStats>,
    pub band_totals: BandTotals,
    pub letter_distribution: LetterDistribution,
    pub top_performers: Vec<StudentRanking>,
    pub bottom_performers: Vec<StudentRanking>,
    pub best_subject: Option<SubjectAverage>,
    pub worst_subject: Option<SubjectAverage>,
    pub correlations: Vec<SubjectCorrelation>,
    pub students: Vec<StudentReport>,
}
