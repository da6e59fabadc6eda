use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Axis-aligned region in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub const INDIA: BoundingBox = BoundingBox {
        west: 68.0,
        south: 6.0,
        east: 97.0,
        north: 37.0,
    };

    /// `[west, south, east, north]`, the order the rectangle constructor takes.
    pub fn corners(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::INDIA
    }
}

/// Inclusive range of calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self::new(2014, 2023)
    }
}

/// Half-open date interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn start_millis(&self) -> i64 {
        epoch_millis(self.start)
    }

    pub fn end_millis(&self) -> i64 {
        epoch_millis(self.end)
    }
}

fn epoch_millis(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub points: u64,
    /// Nominal pixel scale in metres.
    pub scale: f64,
    pub geometries: bool,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            points: 5000,
            scale: 500.0,
            geometries: true,
        }
    }
}

/// Table formats accepted by the table export endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileFormat {
    #[default]
    Csv,
    GeoJson,
    Kml,
    Kmz,
    Shp,
    TfRecord,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::GeoJson => "geojson",
            FileFormat::Kml => "kml",
            FileFormat::Kmz => "kmz",
            FileFormat::Shp => "zip",
            FileFormat::TfRecord => "tfrecord",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Destination {
    Drive { folder: Option<String> },
    CloudStorage { bucket: String },
}

impl Default for Destination {
    fn default() -> Self {
        Destination::Drive { folder: None }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Drive { folder: Some(folder) } => write!(f, "Google Drive folder '{}'", folder),
            Destination::Drive { folder: None } => write!(f, "Google Drive (root)"),
            Destination::CloudStorage { bucket } => write!(f, "gs://{}", bucket),
        }
    }
}

/// One node of the platform's serialized computation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueNode {
    ConstantValue(serde_json::Value),
    FunctionInvocationValue(FunctionInvocation),
    ArrayValue { values: Vec<ValueNode> },
    ValueReference(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInvocation {
    pub function_name: String,
    pub arguments: BTreeMap<String, ValueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub result: String,
    pub values: BTreeMap<String, ValueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveDestination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub filename_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudStorageDestination {
    pub bucket: String,
    pub filename_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileExportOptions {
    pub file_format: FileFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_destination: Option<DriveDestination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_storage_destination: Option<CloudStorageDestination>,
}

/// Body of `POST /v1/projects/{project}/table:export`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableExportRequest {
    pub expression: Expression,
    pub description: String,
    pub request_id: String,
    pub file_export_options: FileExportOptions,
}

/// Everything needed to submit the export for a single year.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTask {
    pub year: i32,
    pub date_range: DateRange,
    pub seed: i64,
    pub description: String,
    pub request: TableExportRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    Pending,
    Running,
    Cancelling,
    Succeeded,
    Cancelled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Succeeded | OperationState::Cancelled | OperationState::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetadata {
    #[serde(default)]
    pub state: Option<OperationState>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Long-running job handle returned by the export endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<OperationMetadata>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
}

impl Operation {
    pub fn state(&self) -> OperationState {
        if let Some(state) = self.metadata.as_ref().and_then(|m| m.state) {
            return state;
        }
        match (self.done, &self.error) {
            (true, Some(_)) => OperationState::Failed,
            (true, None) => OperationState::Succeeded,
            (false, _) => OperationState::Pending,
        }
    }
}

/// Outcome recorded for one year of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReceipt {
    pub year: i32,
    pub description: String,
    pub request_id: String,
    pub operation: Option<String>,
    pub state: Option<OperationState>,
    pub error: Option<String>,
}

impl ExportReceipt {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
            || matches!(
                self.state,
                Some(OperationState::Failed) | Some(OperationState::Cancelled)
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_stamp: String,
    pub project: String,
    pub destination: Destination,
    pub waited: bool,
    pub receipts: Vec<ExportReceipt>,
}

impl RunReport {
    pub fn submitted(&self) -> usize {
        self.receipts.iter().filter(|r| r.operation.is_some()).count()
    }

    pub fn failed(&self) -> Vec<&ExportReceipt> {
        self.receipts.iter().filter(|r| r.is_failed()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed().is_empty()
    }
}
