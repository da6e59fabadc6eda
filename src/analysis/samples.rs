//! Reading the exported sample tables back.
//!
//! A table export with geometries retained has one row per sampled point: the
//! band value(s), `system:index`, and a `.geo` column holding the point as
//! GeoJSON.

use crate::utils::error::{ExportError, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

pub const GEOMETRY_COLUMN: &str = ".geo";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub radiance: f64,
}

#[derive(Debug, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<f64>,
}

/// Parses a GeoJSON point into `(longitude, latitude)`.
pub fn parse_point(geo: &str) -> Option<(f64, f64)> {
    let point: GeoJsonPoint = serde_json::from_str(geo).ok()?;
    if point.kind != "Point" {
        return None;
    }
    match point.coordinates.as_slice() {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some((*lon, *lat)),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    pub points: Vec<SamplePoint>,
    /// Rows dropped for a missing or malformed geometry or band value.
    pub skipped: usize,
}

pub fn read_samples<R: Read>(reader: R, band: &str) -> Result<SampleTable> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ExportError::ProcessingError {
                message: format!("Column '{}' not found in sample table", name),
            })
    };
    let geo_idx = column(GEOMETRY_COLUMN)?;
    let band_idx = column(band)?;

    let mut table = SampleTable::default();
    for record in rdr.records() {
        let record = record?;

        let point = record.get(geo_idx).and_then(parse_point);
        let radiance = record
            .get(band_idx)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite());

        match (point, radiance) {
            (Some((longitude, latitude)), Some(radiance)) => table.points.push(SamplePoint {
                latitude,
                longitude,
                radiance,
            }),
            _ => table.skipped += 1,
        }
    }

    if table.skipped > 0 {
        tracing::debug!("Skipped {} rows without a usable point or value", table.skipped);
    }

    Ok(table)
}

/// File the export for `year` lands in once downloaded: `<prefix><year>.csv`.
pub fn export_file_name(prefix: &str, year: i32) -> String {
    format!("{}{}.csv", prefix, year)
}

pub fn export_file_path(dir: &Path, prefix: &str, year: i32) -> PathBuf {
    dir.join(export_file_name(prefix, year))
}

/// Loads one year's table; `Ok(None)` when the file has not been downloaded.
pub fn load_year(dir: &Path, prefix: &str, year: i32, band: &str) -> Result<Option<SampleTable>> {
    let path = export_file_path(dir, prefix, year);
    if !path.is_file() {
        tracing::warn!("Missing export for {}: {}", year, path.display());
        return Ok(None);
    }

    tracing::debug!("Reading {}", path.display());
    let file = std::fs::File::open(&path)?;
    read_samples(file, band).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "system:index,avg_rad,.geo\n\
0,1.5,\"{\"\"type\"\":\"\"Point\"\",\"\"coordinates\"\":[77.2,28.6]}\"\n\
1,0.2,\"{\"\"type\"\":\"\"Point\"\",\"\"coordinates\"\":[80.1,12.9]}\"\n\
2,,\"{\"\"type\"\":\"\"Point\"\",\"\"coordinates\"\":[70.0,20.0]}\"\n\
3,4.0,not-json\n";

    #[test]
    fn test_parse_point() {
        assert_eq!(
            parse_point(r#"{"type":"Point","coordinates":[77.2,28.6]}"#),
            Some((77.2, 28.6))
        );
        assert_eq!(parse_point(r#"{"type":"LineString","coordinates":[1,2]}"#), None);
        assert_eq!(parse_point(r#"{"type":"Point","coordinates":[1]}"#), None);
        assert_eq!(parse_point("garbage"), None);
    }

    #[test]
    fn test_read_samples_skips_bad_rows() {
        let table = read_samples(TABLE.as_bytes(), "avg_rad").unwrap();
        assert_eq!(table.points.len(), 2);
        assert_eq!(table.skipped, 2);
        assert_eq!(
            table.points[0],
            SamplePoint {
                latitude: 28.6,
                longitude: 77.2,
                radiance: 1.5
            }
        );
        assert_eq!(table.points[1].radiance, 0.2);
    }

    #[test]
    fn test_missing_band_column() {
        let err = read_samples(TABLE.as_bytes(), "rad").unwrap_err();
        assert!(matches!(err, ExportError::ProcessingError { .. }));
    }

    #[test]
    fn test_load_year_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_year(dir.path(), "VIIRS_India_", 2014, "avg_rad")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_load_year_reads_named_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("VIIRS_India_2015.csv"), TABLE).unwrap();
        let table = load_year(dir.path(), "VIIRS_India_", 2015, "avg_rad")
            .unwrap()
            .unwrap();
        assert_eq!(table.points.len(), 2);
    }
}
