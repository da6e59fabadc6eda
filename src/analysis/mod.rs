//! Offline analysis of the downloaded yearly sample tables.

pub mod report;
pub mod samples;
pub mod stats;

pub use report::{analyze, write_summary_csv, AnalysisOptions, TrendReport};
pub use samples::{read_samples, SamplePoint};
pub use stats::{assess_site, Suitability, DARK_SKY_THRESHOLD};
