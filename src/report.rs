use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::config::AnalyticsConfig;
use crate::models::{
    ClassOverview, ClassReport, GradeBand, PerformanceLevel, Remark, StudentRanking, StudentReport,
    SubjectAverage, SubjectGrade, SubjectPerformance, SubjectStats,
};
use crate::table::Table;
use crate::{ranking, stats};

const HIGH_PERFORMER_AVERAGE: f64 = 85.0;
const LOW_PERFORMER_AVERAGE: f64 = 60.0;
const STRENGTH_SCORE: f64 = 85.0;
const WEAKNESS_SCORE: f64 = 70.0;

pub fn remark_for(average: f64) -> Remark {
    match average {
        a if a >= 90.0 => Remark::Maintain,
        a if a >= 80.0 => Remark::ImproveWeakSubjects,
        a if a >= 60.0 => Remark::StrengthenFundamentals,
        _ => Remark::BroadImprovement,
    }
}

pub fn performance_level(score: f64, subject_average: f64) -> PerformanceLevel {
    if score >= subject_average + 15.0 {
        PerformanceLevel::Excellent
    } else if score >= subject_average + 5.0 {
        PerformanceLevel::Good
    } else if score >= subject_average - 5.0 {
        PerformanceLevel::Average
    } else {
        PerformanceLevel::NeedsImprovement
    }
}

/// Per-subject figures every student report looks up.
struct SubjectLookup {
    average: f64,
    /// Column sorted ascending, for percentiles.
    sorted: Vec<f64>,
    /// Leaderboard position by record index.
    ranks: Vec<usize>,
}

fn subject_lookups(table: &Table, subject_stats: &[SubjectStats]) -> HashMap<String, SubjectLookup> {
    subject_stats
        .iter()
        .map(|s| {
            let mut ranks = vec![0; table.len()];
            for entry in ranking::rank_by_subject(table, &s.subject) {
                ranks[entry.original_index] = entry.rank;
            }
            let lookup = SubjectLookup {
                average: s.mean,
                sorted: stats::sorted(&table.column(&s.subject)),
                ranks,
            };
            (s.subject.clone(), lookup)
        })
        .collect()
}

fn build_student_report(
    student: &StudentRanking,
    lookups: &HashMap<String, SubjectLookup>,
    attention_margin: f64,
) -> StudentReport {
    let average_of = |subject: &str| lookups.get(subject).map_or(0.0, |l| l.average);

    let performance = student
        .grades
        .iter()
        .map(|grade| {
            let lookup = lookups.get(&grade.subject);
            let average = average_of(&grade.subject);
            SubjectPerformance {
                subject: grade.subject.clone(),
                score: grade.score,
                grade: grade.grade,
                subject_average: average,
                difference: grade.score - average,
                percentile: lookup.map_or(0, |l| stats::percentile_of(&l.sorted, grade.score)),
                subject_rank: lookup
                    .and_then(|l| l.ranks.get(student.original_index).copied())
                    .unwrap_or_default(),
                level: performance_level(grade.score, average),
            }
        })
        .collect();

    let mut strengths: Vec<SubjectGrade> = student
        .grades
        .iter()
        .filter(|grade| grade.score >= STRENGTH_SCORE)
        .cloned()
        .collect();
    strengths.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut weaknesses: Vec<SubjectGrade> = student
        .grades
        .iter()
        .filter(|grade| grade.score < WEAKNESS_SCORE)
        .cloned()
        .collect();
    weaknesses.sort_by(|a, b| a.score.total_cmp(&b.score));

    let needs_attention = student
        .grades
        .iter()
        .filter(|grade| grade.score < average_of(&grade.subject) - attention_margin)
        .map(|grade| grade.subject.clone())
        .collect();

    StudentReport {
        ranking: student.clone(),
        performance,
        strengths,
        weaknesses,
        needs_attention,
        remark: remark_for(student.average),
    }
}

fn extreme_subject(subject_stats: &[SubjectStats], best: bool) -> Option<SubjectAverage> {
    let mut chosen: Option<&SubjectStats> = None;
    for candidate in subject_stats {
        let better = match chosen {
            None => true,
            Some(current) if best => candidate.mean > current.mean,
            Some(current) => candidate.mean < current.mean,
        };
        if better {
            chosen = Some(candidate);
        }
    }
    chosen.map(|s| SubjectAverage {
        subject: s.subject.clone(),
        average: s.mean,
    })
}

/// Assembles everything the presentation layer needs from one table.
pub fn summarize(table: &Table, config: &AnalyticsConfig) -> ClassReport {
    let subject_stats = stats::compute_subject_stats(table);
    let rankings = ranking::rank(table);
    let total_students = rankings.len();

    let totals: Vec<f64> = rankings.iter().map(|r| r.total).collect();
    let high_performers = rankings
        .iter()
        .filter(|r| r.average >= HIGH_PERFORMER_AVERAGE)
        .count();
    let low_performers = rankings
        .iter()
        .filter(|r| r.average < LOW_PERFORMER_AVERAGE)
        .count();

    let (lowest_total, highest_total) = if totals.is_empty() {
        (0.0, 0.0)
    } else {
        (
            totals.iter().copied().fold(f64::INFINITY, f64::min),
            totals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        )
    };

    let overview = ClassOverview {
        total_students,
        subject_count: table.subjects().len(),
        class_average: stats::mean(&totals),
        high_performers,
        low_performers,
        pass_rate: stats::rate(total_students - low_performers, total_students),
        lowest_total,
        highest_total,
    };

    let top_n = config.top_n.min(total_students);
    let top_performers = rankings[..top_n].to_vec();
    let bottom_performers = rankings[total_students - top_n..].to_vec();

    let lookups = subject_lookups(table, &subject_stats);
    let students = rankings
        .iter()
        .map(|r| build_student_report(r, &lookups, config.attention_margin))
        .collect();

    ClassReport {
        overview,
        band_totals: stats::band_totals(table),
        letter_distribution: stats::letter_distribution(table),
        top_performers,
        bottom_performers,
        best_subject: extreme_subject(&subject_stats, true),
        worst_subject: extreme_subject(&subject_stats, false),
        correlations: ranking::correlate(table).pairs(),
        subject_stats,
        students,
    }
}

/// Report for the first student called `name`, if any.
pub fn student_report(table: &Table, name: &str, config: &AnalyticsConfig) -> Option<StudentReport> {
    let subject_stats = stats::compute_subject_stats(table);
    let lookups = subject_lookups(table, &subject_stats);
    ranking::rank(table)
        .iter()
        .filter(|r| r.name == name)
        .min_by_key(|r| r.original_index)
        .map(|r| build_student_report(r, &lookups, config.attention_margin))
}

pub fn render_json(report: &ClassReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

fn ranking_line(output: &mut String, entry: &StudentRanking) {
    let medal = ranking::medal(entry.rank)
        .map(|m| format!("{m} "))
        .unwrap_or_default();
    let _ = writeln!(
        output,
        "- {}#{} {} total {:.1} (avg {:.1})",
        medal, entry.rank, entry.name, entry.total, entry.average
    );
}

pub fn render_markdown(report: &ClassReport, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();
    let overview = &report.overview;

    let _ = writeln!(output, "# Class Score Report");
    let _ = writeln!(
        output,
        "Generated {} for {} students across {} subjects",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        overview.total_students,
        overview.subject_count
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Class average total: {:.2}", overview.class_average);
    let _ = writeln!(output, "- Pass rate: {:.1}%", overview.pass_rate);
    let _ = writeln!(output, "- High performers (avg >= 85): {}", overview.high_performers);
    let _ = writeln!(output, "- Low performers (avg < 60): {}", overview.low_performers);
    let _ = writeln!(
        output,
        "- Total range: {:.1} - {:.1}",
        overview.lowest_total, overview.highest_total
    );
    if let Some(best) = &report.best_subject {
        let _ = writeln!(output, "- Best subject: {} ({:.1})", best.subject, best.average);
    }
    if let Some(worst) = &report.worst_subject {
        let _ = writeln!(output, "- Weakest subject: {} ({:.1})", worst.subject, worst.average);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");
    if report.subject_stats.is_empty() {
        let _ = writeln!(output, "No scores recorded.");
    } else {
        let _ = write!(output, "| Subject | Mean | Median | Mode | Std dev | Min | Max |");
        for band in GradeBand::ALL {
            let _ = write!(output, " {} |", band.label());
        }
        let _ = writeln!(output, " Pass rate |");
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|---|---|---|");
        for s in &report.subject_stats {
            let _ = write!(
                output,
                "| {} | {:.2} | {:.2} | {} | {:.2} | {} | {} |",
                s.subject, s.mean, s.median, s.mode, s.std_dev, s.min, s.max
            );
            for band in GradeBand::ALL {
                let count = s.band(band);
                let _ = write!(output, " {} ({:.1}%) |", count.count, count.rate);
            }
            let _ = writeln!(output, " {:.1}% |", s.pass_rate);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");
    let bands = &report.band_totals;
    let _ = writeln!(
        output,
        "- Bands: excellent {}, good {}, pass {}, fail {}",
        bands.excellent, bands.good, bands.pass, bands.fail
    );
    let letters = &report.letter_distribution;
    let _ = writeln!(
        output,
        "- Letters: A {}, B {}, C {}, D {}, F {}",
        letters.a, letters.b, letters.c, letters.d, letters.f
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");
    if report.top_performers.is_empty() {
        let _ = writeln!(output, "No students recorded.");
    }
    for entry in &report.top_performers {
        ranking_line(&mut output, entry);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Bottom Performers");
    if report.bottom_performers.is_empty() {
        let _ = writeln!(output, "No students recorded.");
    }
    for entry in &report.bottom_performers {
        ranking_line(&mut output, entry);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Correlations");
    if report.correlations.is_empty() {
        let _ = writeln!(output, "Need at least two subjects.");
    }
    for pair in &report.correlations {
        let _ = writeln!(
            output,
            "- {} / {}: {:.3} ({})",
            pair.first, pair.second, pair.coefficient, pair.strength
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");
    for student in &report.students {
        let _ = write!(output, "- {}: {}", student.ranking.name, student.remark);
        if !student.needs_attention.is_empty() {
            let _ = write!(output, "; needs attention: {}", student.needs_attention.join(", "));
        }
        let _ = writeln!(output);
    }

    output
}
