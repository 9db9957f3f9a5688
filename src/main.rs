use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use score_analytics::ingest::{self, IngestOptions, Ingestion};
use score_analytics::{export, ranking, report, sample, AnalyticsConfig, Table};

#[derive(Parser)]
#[command(name = "score-analytics")]
#[command(about = "Class score statistics, rankings and reports from CSV gradebooks", long_about = None)]
struct Cli {
    /// JSON file overriding name aliases, default subjects and report settings
    #[arg(long, global = true, env = "SCORE_ANALYTICS_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter for stderr output (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the full class report from a CSV file
    Analyze {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show one student's report
    Student {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        name: String,
    },
    /// Print the overall or per-subject leaderboard
    Rank {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Re-export a CSV with total, average and rank columns
    Export {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "scores-ranked.csv")]
        out: PathBuf,
    },
    /// Write an upload template for a subject list
    Template {
        #[arg(long, value_delimiter = ',')]
        subjects: Vec<String>,
        #[arg(long, default_value = "score-template.csv")]
        out: PathBuf,
    },
    /// Report on the built-in sample class
    Demo {
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
    },
}

fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn load(csv: &Path, options: &IngestOptions) -> anyhow::Result<Ingestion> {
    let ingestion = ingest::load_file(csv, options)
        .await
        .with_context(|| format!("failed to load scores from {}", csv.display()))?;
    info!(
        "Loaded {} students and {} subjects from {} ({:?}, {} rows skipped)",
        ingestion.table.len(),
        ingestion.table.subjects().len(),
        csv.display(),
        ingestion.encoding,
        ingestion.skipped.len()
    );
    Ok(ingestion)
}

fn render(table: &Table, config: &AnalyticsConfig, format: Format) -> anyhow::Result<String> {
    let class_report = report::summarize(table, config);
    match format {
        Format::Markdown => Ok(report::render_markdown(&class_report, Utc::now())),
        Format::Json => report::render_json(&class_report).context("failed to serialize report"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config = AnalyticsConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    let options = IngestOptions::from(&config);

    match cli.command {
        Commands::Analyze { csv, format, out } => {
            let ingestion = load(&csv, &options).await?;
            let output = render(&ingestion.table, &config, format)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, output)?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{output}"),
            }
        }
        Commands::Student { csv, name } => {
            let ingestion = load(&csv, &options).await?;
            let Some(student) = report::student_report(&ingestion.table, &name, &config) else {
                println!("No student named {name}.");
                return Ok(());
            };

            let ranking = &student.ranking;
            println!(
                "{} ranked #{} with total {:.1} (avg {:.1})",
                ranking.name, ranking.rank, ranking.total, ranking.average
            );
            for p in &student.performance {
                println!(
                    "- {}: {} ({}) vs avg {:.2}, subject rank #{}, {}th percentile, {}",
                    p.subject, p.score, p.grade, p.subject_average, p.subject_rank, p.percentile, p.level
                );
            }
            if !student.needs_attention.is_empty() {
                println!("Needs attention: {}", student.needs_attention.join(", "));
            }
            println!("Remark: {}", student.remark);
        }
        Commands::Rank {
            csv,
            subject,
            limit,
        } => {
            let ingestion = load(&csv, &options).await?;
            let table = &ingestion.table;
            match subject {
                Some(subject) => {
                    anyhow::ensure!(
                        table.subjects().contains(&subject),
                        "unknown subject {subject}; available: {}",
                        table.subjects().join(", ")
                    );
                    println!("Leaderboard for {subject}:");
                    for entry in ranking::rank_by_subject(table, &subject).iter().take(limit) {
                        println!("- #{} {} {} ({})", entry.rank, entry.name, entry.score, entry.grade);
                    }
                }
                None => {
                    println!("Top students by total:");
                    for entry in ranking::rank(table).iter().take(limit) {
                        let medal = ranking::medal(entry.rank).unwrap_or("");
                        println!(
                            "- #{} {} {} total {:.1} (avg {:.1})",
                            entry.rank, medal, entry.name, entry.total, entry.average
                        );
                    }
                }
            }
        }
        Commands::Export { csv, out } => {
            let ingestion = load(&csv, &options).await?;
            let content = export::to_csv(&ingestion.table).context("failed to build CSV")?;
            std::fs::write(&out, content)?;
            println!(
                "Exported {} students to {}.",
                ingestion.table.len(),
                out.display()
            );
        }
        Commands::Template { subjects, out } => {
            let subjects = if subjects.is_empty() {
                config.default_subjects.clone()
            } else {
                subjects
            };
            let name_header = config
                .name_aliases
                .first()
                .cloned()
                .context("no name alias configured")?;
            let table = Table::with_subjects(name_header, &subjects, config.max_subject_name_len)
                .context("invalid subject list")?;
            let content = export::template_csv(table.name_header(), table.subjects())
                .context("failed to build CSV")?;
            std::fs::write(&out, content)?;
            println!(
                "Template with {} subjects written to {}.",
                table.subjects().len(),
                out.display()
            );
        }
        Commands::Demo { format } => {
            print!("{}", render(&sample::sample_table(), &config, format)?);
        }
    }

    Ok(())
}
