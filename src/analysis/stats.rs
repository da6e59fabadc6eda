use crate::analysis::samples::SamplePoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Radiance (nW/cm²/sr) above which a site is not considered dark enough for
/// observation.
pub const DARK_SKY_THRESHOLD: f64 = 3.0;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Linear-interpolated quantile of an ascending slice, `q` in `[0, 1]`.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Tukey fences `(Q1 - 1.5·IQR, Q3 + 1.5·IQR)`.
pub fn iqr_bounds(values: &[f64]) -> Option<(f64, f64)> {
    let s = sorted(values);
    let q1 = quantile(&s, 0.25)?;
    let q3 = quantile(&s, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - 1.5 * iqr, q3 + 1.5 * iqr))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub total: f64,
}

pub fn summarize(year: i32, values: &[f64]) -> Option<YearSummary> {
    let s = sorted(values);
    let median = quantile(&s, 0.5)?;
    let total: f64 = s.iter().sum();
    Some(YearSummary {
        year,
        count: s.len(),
        mean: total / s.len() as f64,
        median,
        max: *s.last()?,
        total,
    })
}

/// Percent change of `to` relative to `from`; `None` when `from` is zero.
pub fn percent_change(from: f64, to: f64) -> Option<f64> {
    (from != 0.0).then(|| (to / from - 1.0) * 100.0)
}

/// Year-over-year change of the mean, aligned with `summaries` (the first
/// entry has no predecessor).
pub fn year_over_year(summaries: &[YearSummary]) -> Vec<Option<f64>> {
    let mut changes = Vec::with_capacity(summaries.len());
    changes.push(None);
    changes.extend(
        summaries
            .windows(2)
            .map(|w| percent_change(w[0].mean, w[1].mean)),
    );
    changes.truncate(summaries.len());
    changes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    North,
    South,
    West,
    East,
    Central,
}

impl Region {
    pub fn classify(latitude: f64, longitude: f64) -> Self {
        if latitude > 28.0 {
            Region::North
        } else if latitude < 18.0 {
            Region::South
        } else if longitude < 78.0 {
            Region::West
        } else if longitude > 85.0 {
            Region::East
        } else {
            Region::Central
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub fn regional_means(points: &[SamplePoint]) -> BTreeMap<Region, f64> {
    let mut sums: BTreeMap<Region, (f64, usize)> = BTreeMap::new();
    for p in points {
        let entry = sums
            .entry(Region::classify(p.latitude, p.longitude))
            .or_insert((0.0, 0));
        entry.0 += p.radiance;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(region, (sum, n))| (region, sum / n as f64))
        .collect()
}

/// Great-circle distance in metres.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().asin()
}

pub fn nearest(points: &[SamplePoint], latitude: f64, longitude: f64) -> Option<(SamplePoint, f64)> {
    points
        .iter()
        .map(|p| (*p, haversine_distance(latitude, longitude, p.latitude, p.longitude)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Suitability {
    Suitable,
    Unsuitable,
}

impl Suitability {
    pub fn for_radiance(radiance: f64) -> Self {
        if radiance > DARK_SKY_THRESHOLD {
            Suitability::Unsuitable
        } else {
            Suitability::Suitable
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteAssessment {
    pub nearest: SamplePoint,
    pub distance_m: f64,
    pub suitability: Suitability,
}

/// Assesses a site from the nearest lit sample; unlit (zero or negative)
/// pixels carry no signal and are ignored.
pub fn assess_site(points: &[SamplePoint], latitude: f64, longitude: f64) -> Option<SiteAssessment> {
    let lit: Vec<SamplePoint> = points.iter().copied().filter(|p| p.radiance > 0.0).collect();
    let (nearest, distance_m) = nearest(&lit, latitude, longitude)?;
    Some(SiteAssessment {
        nearest,
        distance_m,
        suitability: Suitability::for_radiance(nearest.radiance),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(latitude: f64, longitude: f64, radiance: f64) -> SamplePoint {
        SamplePoint {
            latitude,
            longitude,
            radiance,
        }
    }

    #[test]
    fn test_quantile_interpolates() {
        let s = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&s, 0.0), Some(1.0));
        assert_eq!(quantile(&s, 0.5), Some(2.5));
        assert_eq!(quantile(&s, 0.25), Some(1.75));
        assert_eq!(quantile(&s, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_iqr_bounds() {
        // Sorted: 1, 2, 2, 2.5, 3, 100 -> Q1 2.0, Q3 2.875.
        let (lo, hi) = iqr_bounds(&[1.0, 2.0, 2.0, 3.0, 2.5, 100.0]).unwrap();
        assert!((lo - 0.6875).abs() < 1e-9);
        assert!((hi - 4.1875).abs() < 1e-9);
        assert!(iqr_bounds(&[]).is_none());
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(2014, &[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.max, 4.0);
        assert_eq!(summary.total, 10.0);
        assert!(summarize(2014, &[]).is_none());
    }

    #[test]
    fn test_year_over_year() {
        let a = summarize(2014, &[2.0]).unwrap();
        let b = summarize(2015, &[3.0]).unwrap();
        let c = summarize(2016, &[1.5]).unwrap();
        let changes = year_over_year(&[a, b, c]);
        assert_eq!(changes, vec![None, Some(50.0), Some(-50.0)]);
        assert!(year_over_year(&[]).is_empty());
        assert_eq!(percent_change(0.0, 1.0), None);
    }

    #[test]
    fn test_region_classification() {
        assert_eq!(Region::classify(28.6, 77.2), Region::North);
        assert_eq!(Region::classify(13.0, 80.2), Region::South);
        assert_eq!(Region::classify(19.0, 72.8), Region::West);
        assert_eq!(Region::classify(22.5, 88.3), Region::East);
        assert_eq!(Region::classify(23.2, 79.9), Region::Central);
        // Boundaries fall through to the next rule.
        assert_eq!(Region::classify(28.0, 77.0), Region::West);
        assert_eq!(Region::classify(18.0, 85.0), Region::Central);
    }

    #[test]
    fn test_regional_means() {
        let points = [
            point(30.0, 77.0, 2.0),
            point(31.0, 77.0, 4.0),
            point(10.0, 77.0, 1.0),
        ];
        let means = regional_means(&points);
        assert_eq!(means.get(&Region::North), Some(&3.0));
        assert_eq!(means.get(&Region::South), Some(&1.0));
        assert!(!means.contains_key(&Region::East));
    }

    #[test]
    fn test_haversine_delhi_mumbai() {
        let d = haversine_distance(28.6139, 77.2090, 19.0760, 72.8777) / 1000.0;
        assert!((d - 1150.0).abs() < 15.0, "distance was {} km", d);
        assert!(haversine_distance(20.0, 78.0, 20.0, 78.0).abs() < 1e-6);
    }

    #[test]
    fn test_assess_site_ignores_unlit_points() {
        let points = [
            point(28.61, 77.21, 0.0),
            point(28.70, 77.10, 12.0),
            point(10.0, 77.0, 0.5),
        ];
        let assessment = assess_site(&points, 28.6139, 77.2090).unwrap();
        assert_eq!(assessment.nearest.radiance, 12.0);
        assert_eq!(assessment.suitability, Suitability::Unsuitable);

        let dark = assess_site(&points, 10.01, 77.0).unwrap();
        assert_eq!(dark.suitability, Suitability::Suitable);
        assert!(dark.distance_m < 2_000.0);

        assert!(assess_site(&[point(1.0, 1.0, 0.0)], 1.0, 1.0).is_none());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(Suitability::for_radiance(3.0), Suitability::Suitable);
        assert_eq!(Suitability::for_radiance(3.01), Suitability::Unsuitable);
    }
}
