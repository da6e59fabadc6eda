use crate::analysis::samples::{load_year, SamplePoint};
use crate::analysis::stats::{
    iqr_bounds, percent_change, regional_means, summarize, year_over_year, Region, YearSummary,
};
use crate::domain::model::YearRange;
use crate::utils::error::{ExportError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

pub const SUMMARY_FILE: &str = "viirs_summary.csv";

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub data_dir: PathBuf,
    pub prefix: String,
    pub band: String,
    pub years: YearRange,
    pub remove_outliers: bool,
}

#[derive(Debug, Clone)]
pub struct YearAnalysis {
    pub summary: YearSummary,
    pub regions: BTreeMap<Region, f64>,
    pub points: Vec<SamplePoint>,
    pub skipped_rows: usize,
    pub outliers_removed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TrendReport {
    pub years: Vec<YearAnalysis>,
    pub year_over_year: Vec<Option<f64>>,
    pub missing_years: Vec<i32>,
}

impl TrendReport {
    /// Change of the mean from the first to the last analysed year.
    pub fn overall_change(&self) -> Option<f64> {
        let first = self.years.first()?;
        let last = self.years.last()?;
        if first.summary.year == last.summary.year {
            return None;
        }
        percent_change(first.summary.mean, last.summary.mean)
    }

    pub fn regional_change(&self) -> BTreeMap<Region, f64> {
        let (Some(first), Some(last)) = (self.years.first(), self.years.last()) else {
            return BTreeMap::new();
        };
        first
            .regions
            .iter()
            .filter_map(|(region, from)| {
                let to = last.regions.get(region)?;
                Some((*region, percent_change(*from, *to)?))
            })
            .collect()
    }

    pub fn year(&self, year: i32) -> Option<&YearAnalysis> {
        self.years.iter().find(|y| y.summary.year == year)
    }
}

fn analyze_points(year: i32, points: Vec<SamplePoint>, skipped_rows: usize, drop_outliers: bool) -> Option<YearAnalysis> {
    let before = points.len();
    let points = if drop_outliers {
        let radiances: Vec<f64> = points.iter().map(|p| p.radiance).collect();
        match iqr_bounds(&radiances) {
            Some((lo, hi)) => points
                .into_iter()
                .filter(|p| p.radiance >= lo && p.radiance <= hi)
                .collect(),
            None => points,
        }
    } else {
        points
    };

    let radiances: Vec<f64> = points.iter().map(|p| p.radiance).collect();
    let summary = summarize(year, &radiances)?;
    Some(YearAnalysis {
        summary,
        regions: regional_means(&points),
        outliers_removed: before - points.len(),
        points,
        skipped_rows,
    })
}

pub fn analyze(options: &AnalysisOptions) -> Result<TrendReport> {
    let mut report = TrendReport::default();

    for year in options.years.years() {
        let Some(table) = load_year(&options.data_dir, &options.prefix, year, &options.band)? else {
            report.missing_years.push(year);
            continue;
        };

        match analyze_points(year, table.points, table.skipped, options.remove_outliers) {
            Some(analysis) => {
                tracing::info!(
                    "📊 {}: {} points, mean {:.3}, median {:.3}",
                    year,
                    analysis.summary.count,
                    analysis.summary.mean,
                    analysis.summary.median
                );
                report.years.push(analysis);
            }
            None => {
                tracing::warn!("{} has no usable samples", year);
                report.missing_years.push(year);
            }
        }
    }

    if report.years.is_empty() {
        return Err(ExportError::ProcessingError {
            message: format!(
                "No sample tables found in {} for {}..={}",
                options.data_dir.display(),
                options.years.start,
                options.years.end
            ),
        });
    }

    let summaries: Vec<YearSummary> = report.years.iter().map(|y| y.summary.clone()).collect();
    report.year_over_year = year_over_year(&summaries);
    Ok(report)
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    year: i32,
    count: usize,
    mean: f64,
    median: f64,
    max: f64,
    total: f64,
    yoy_change_pct: Option<f64>,
    north: Option<f64>,
    south: Option<f64>,
    west: Option<f64>,
    east: Option<f64>,
    central: Option<f64>,
}

pub fn write_summary_csv<W: Write>(report: &TrendReport, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for (analysis, yoy) in report.years.iter().zip(&report.year_over_year) {
        let s = &analysis.summary;
        let region = |r: Region| analysis.regions.get(&r).copied();
        wtr.serialize(SummaryRow {
            year: s.year,
            count: s.count,
            mean: s.mean,
            median: s.median,
            max: s.max,
            total: s.total,
            yoy_change_pct: *yoy,
            north: region(Region::North),
            south: region(Region::South),
            west: region(Region::West),
            east: region(Region::East),
            central: region(Region::Central),
        })?;
    }

    wtr.flush()?;
    Ok(())
}
