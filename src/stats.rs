//! Descriptive statistics over a table's score columns.

use std::cmp::Ordering;

use crate::models::{BandCount, BandTotals, GradeBand, LetterDistribution, LetterGrade, SubjectStats};
use crate::table::Table;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Percentage of `part` in `whole`, one decimal. 0 for an empty whole.
pub fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 1)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted(values);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Most frequent value; on a frequency tie the smallest value wins.
pub fn mode(values: &[f64]) -> f64 {
    let sorted = sorted(values);
    let mut best = 0.0;
    let mut best_count = 0;
    let mut index = 0;
    while index < sorted.len() {
        let value = sorted[index];
        let run = sorted[index..].iter().take_while(|&&v| v == value).count();
        if run > best_count {
            best = value;
            best_count = run;
        }
        index += run;
    }
    best
}

/// Population variance (divides by N).
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

pub fn band_counts(values: &[f64]) -> BandTotals {
    let mut totals = BandTotals::default();
    for &value in values {
        match GradeBand::from_score(value) {
            GradeBand::Excellent => totals.excellent += 1,
            GradeBand::Good => totals.good += 1,
            GradeBand::Pass => totals.pass += 1,
            GradeBand::Fail => totals.fail += 1,
        }
    }
    totals
}

fn subject_stats(table: &Table, subject: &str) -> SubjectStats {
    let scores = table.column(subject);
    let n = scores.len();
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bands = band_counts(&scores);

    let student_with = |target: f64| {
        table
            .records()
            .iter()
            .find(|record| record.score(subject) == target)
            .map(|record| record.name.clone())
            .unwrap_or_default()
    };

    SubjectStats {
        subject: subject.to_string(),
        count: n,
        min,
        max,
        mean: mean(&scores),
        median: median(&scores),
        mode: mode(&scores),
        std_dev: std_dev(&scores),
        variance: variance(&scores),
        excellent: BandCount { count: bands.excellent, rate: rate(bands.excellent, n) },
        good: BandCount { count: bands.good, rate: rate(bands.good, n) },
        pass: BandCount { count: bands.pass, rate: rate(bands.pass, n) },
        fail: BandCount { count: bands.fail, rate: rate(bands.fail, n) },
        pass_rate: rate(bands.excellent + bands.good + bands.pass, n),
        top_student: student_with(max),
        bottom_student: student_with(min),
    }
}

/// Statistics for every subject in column order. Empty for a table without students.
pub fn compute_subject_stats(table: &Table) -> Vec<SubjectStats> {
    if table.is_empty() {
        return Vec::new();
    }
    table
        .subjects()
        .iter()
        .map(|subject| subject_stats(table, subject))
        .collect()
}

/// Band populations summed over every score in the table.
pub fn band_totals(table: &Table) -> BandTotals {
    let mut totals = BandTotals::default();
    for subject in table.subjects() {
        let counts = band_counts(&table.column(subject));
        totals.excellent += counts.excellent;
        totals.good += counts.good;
        totals.pass += counts.pass;
        totals.fail += counts.fail;
    }
    totals
}

/// Letter grades over every score in the table.
pub fn letter_distribution(table: &Table) -> LetterDistribution {
    let mut distribution = LetterDistribution::default();
    for record in table.records() {
        for subject in table.subjects() {
            match LetterGrade::from_score(record.score(subject)) {
                LetterGrade::A => distribution.a += 1,
                LetterGrade::B => distribution.b += 1,
                LetterGrade::C => distribution.c += 1,
                LetterGrade::D => distribution.d += 1,
                LetterGrade::F => distribution.f += 1,
            }
        }
    }
    distribution
}

/// Share of the class scoring at or below `score` in `subject`, as a whole percentage.
///
/// Uses the first occurrence of `score` in ascending order, so tied students share a percentile.
pub fn percentile(table: &Table, subject: &str, score: f64) -> u32 {
    percentile_of(&sorted(&table.column(subject)), score)
}

/// [`percentile`] over a column already sorted ascending.
pub fn percentile_of(sorted: &[f64], score: f64) -> u32 {
    match sorted.iter().position(|&value| value == score) {
        Some(position) => ((position + 1) as f64 / sorted.len() as f64 * 100.0).round() as u32,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    fn table(scores: &[(&str, f64, f64)]) -> Table {
        let mut table = Table::new("name", vec!["Math".to_string(), "Eng".to_string()]).unwrap();
        for (name, math, eng) in scores {
            table
                .add_student(Record::new(*name).with_score("Math", *math).with_score("Eng", *eng))
                .unwrap();
        }
        table
    }

    #[test]
    fn median_handles_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn mode_prefers_smallest_on_tie() {
        assert_eq!(mode(&[90.0, 80.0, 90.0, 80.0, 70.0]), 80.0);
        assert_eq!(mode(&[70.0, 85.0, 85.0]), 85.0);
        assert_eq!(mode(&[55.0]), 55.0);
    }

    #[test]
    fn population_variance_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(variance(&values), 4.0);
        assert_eq!(std_dev(&values), 2.0);
    }

    #[test]
    fn subject_stats_cover_bands_and_extremes() {
        let table = table(&[
            ("A", 95.0, 50.0),
            ("B", 85.0, 60.0),
            ("C", 65.0, 79.0),
            ("D", 40.0, 90.0),
        ]);
        let stats = compute_subject_stats(&table);
        assert_eq!(stats.len(), 2);

        let math = &stats[0];
        assert_eq!(math.subject, "Math");
        assert_eq!(math.min, 40.0);
        assert_eq!(math.max, 95.0);
        assert_eq!(math.mean, 71.25);
        assert_eq!(math.median, 75.0);
        assert_eq!(math.top_student, "A");
        assert_eq!(math.bottom_student, "D");
        assert_eq!(math.excellent.count, 1);
        assert_eq!(math.good.count, 1);
        assert_eq!(math.pass.count, 1);
        assert_eq!(math.fail.count, 1);
        assert_eq!(math.excellent.rate, 25.0);
        assert_eq!(math.pass_rate, 75.0);

        for subject in &stats {
            let total = subject.excellent.count + subject.good.count + subject.pass.count + subject.fail.count;
            assert_eq!(total, subject.count);
            assert!(subject.mean >= subject.min && subject.mean <= subject.max);
        }
    }

    #[test]
    fn rates_round_to_one_decimal() {
        assert_eq!(rate(1, 3), 33.3);
        assert_eq!(rate(2, 3), 66.7);
        assert_eq!(rate(0, 0), 0.0);
    }

    #[test]
    fn empty_table_has_no_stats() {
        assert!(compute_subject_stats(&Table::default()).is_empty());
    }

    #[test]
    fn distributions_count_every_cell() {
        let table = table(&[("A", 95.0, 72.0), ("B", 81.0, 59.0)]);
        let letters = letter_distribution(&table);
        assert_eq!((letters.a, letters.b, letters.c, letters.d, letters.f), (1, 1, 1, 0, 1));
        let bands = band_totals(&table);
        assert_eq!(bands.excellent + bands.good + bands.pass + bands.fail, 4);
        assert_eq!(bands.pass, 1);
    }

    #[test]
    fn band_lookup_matches_fields() {
        let stats = compute_subject_stats(&table(&[("A", 95.0, 50.0), ("B", 85.0, 65.0), ("C", 40.0, 70.0)]));
        let math = &stats[0];
        assert_eq!(math.band(GradeBand::Excellent), math.excellent);
        assert_eq!(math.band(GradeBand::Fail).count, 1);
        assert_eq!(math.band(GradeBand::Pass).count, 0);
        let counted: usize = GradeBand::ALL.iter().map(|&band| math.band(band).count).sum();
        assert_eq!(counted, math.count);
    }

    #[test]
    fn percentile_uses_first_occurrence() {
        let table = table(&[("A", 60.0, 0.0), ("B", 80.0, 0.0), ("C", 80.0, 0.0), ("D", 100.0, 0.0)]);
        assert_eq!(percentile(&table, "Math", 60.0), 25);
        assert_eq!(percentile(&table, "Math", 80.0), 50);
        assert_eq!(percentile(&table, "Math", 100.0), 100);
    }
}
