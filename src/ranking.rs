use std::cmp::Ordering;

use crate::models::{CorrelationMatrix, LetterGrade, StudentRanking, SubjectGrade, SubjectRankEntry};
use crate::stats::round_to;
use crate::table::Table;

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Overall ranking by total, highest first. Equal totals keep table order.
pub fn rank(table: &Table) -> Vec<StudentRanking> {
    let subject_count = table.subjects().len();
    let mut rankings: Vec<StudentRanking> = table
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let grades: Vec<SubjectGrade> = table
                .subjects()
                .iter()
                .map(|subject| {
                    let score = record.score(subject);
                    SubjectGrade {
                        subject: subject.clone(),
                        score,
                        grade: LetterGrade::from_score(score),
                    }
                })
                .collect();
            let total: f64 = grades.iter().map(|grade| grade.score).sum();
            let average = if subject_count == 0 {
                0.0
            } else {
                round_to(total / subject_count as f64, 1)
            };

            StudentRanking {
                name: record.name.clone(),
                original_index: index,
                total,
                average,
                rank: 0,
                grades,
            }
        })
        .collect();

    // sort_by is stable
    rankings.sort_by(|a, b| descending(a.total, b.total));
    for (position, ranking) in rankings.iter_mut().enumerate() {
        ranking.rank = position + 1;
    }
    rankings
}

/// Leaderboard for one subject, numbered independently of the overall ranking.
pub fn rank_by_subject(table: &Table, subject: &str) -> Vec<SubjectRankEntry> {
    let mut entries: Vec<SubjectRankEntry> = table
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let score = record.score(subject);
            SubjectRankEntry {
                name: record.name.clone(),
                original_index: index,
                score,
                grade: LetterGrade::from_score(score),
                rank: 0,
            }
        })
        .collect();

    entries.sort_by(|a, b| descending(a.score, b.score));
    for (position, entry) in entries.iter_mut().enumerate() {
        entry.rank = position + 1;
    }
    entries
}

/// Rank of the record at `original_index` within `subject`.
pub fn subject_rank(table: &Table, subject: &str, original_index: usize) -> Option<usize> {
    rank_by_subject(table, subject)
        .into_iter()
        .find(|entry| entry.original_index == original_index)
        .map(|entry| entry.rank)
}

/// Pearson's r, or 0 when either column has no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let len = xs.len().min(ys.len());
    let (xs, ys) = (&xs[..len], &ys[..len]);
    let n = len as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_x2: f64 = xs.iter().map(|x| x * x).sum();
    let sum_y2: f64 = ys.iter().map(|y| y * y).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let spread = (n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y);
    if spread <= 0.0 {
        return 0.0;
    }
    (numerator / spread.sqrt()).clamp(-1.0, 1.0)
}

/// Coefficients for every subject pair, three decimals.
pub fn correlate(table: &Table) -> CorrelationMatrix {
    let subjects = table.subjects().to_vec();
    let columns: Vec<Vec<f64>> = subjects.iter().map(|subject| table.column(subject)).collect();
    let size = subjects.len();

    let mut values = vec![vec![0.0; size]; size];
    for i in 0..size {
        for j in i..size {
            let r = round_to(pearson(&columns[i], &columns[j]), 3);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    CorrelationMatrix { subjects, values }
}

pub fn medal(rank: usize) -> Option<&'static str> {
    match rank {
        1 => Some("🥇"),
        2 => Some("🥈"),
        3 => Some("🥉"),
        _ => None,
    }
}
