//! Score analytics for classroom gradebooks: CSV ingestion, per-subject
//! statistics, rankings, subject correlations and class reports.

pub mod config;
pub mod encoding;
pub mod error;
pub mod export;
pub mod ingest;
pub mod models;
pub mod ranking;
pub mod report;
pub mod sample;
pub mod stats;
pub mod table;

pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, EncodingFallbackError, ParseError, Result, ValidationError};
pub use ingest::{parse_csv, IngestOptions, Ingestion};
pub use models::{ClassReport, Record};
pub use table::Table;
