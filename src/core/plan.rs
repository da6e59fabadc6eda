use crate::core::expression;
use crate::core::ConfigProvider;
use crate::domain::model::{
    CloudStorageDestination, DateRange, Destination, DriveDestination, ExportTask,
    FileExportOptions, TableExportRequest,
};
use crate::utils::error::{ExportError, Result};
use chrono::NaiveDate;

pub const DEFAULT_DESCRIPTION_PREFIX: &str = "VIIRS_India_";

/// `[Y-01-01, (Y+1)-01-01)`.
pub fn date_range_for_year(year: i32) -> Result<DateRange> {
    let jan_first = |y: i32| {
        NaiveDate::from_ymd_opt(y, 1, 1).ok_or_else(|| ExportError::InvalidConfigValueError {
            field: "years".to_string(),
            value: y.to_string(),
            reason: "Year is outside the supported calendar range".to_string(),
        })
    };

    Ok(DateRange {
        start: jan_first(year)?,
        end: jan_first(year + 1)?,
    })
}

/// The point draw is seeded with the year so reruns reproduce the same points.
pub fn seed_for_year(year: i32) -> i64 {
    i64::from(year)
}

pub fn description_for_year(prefix: &str, year: i32) -> String {
    format!("{}{}", prefix, year)
}

/// Export request ids must match `[a-zA-Z0-9-]{9,60}`.
pub const MIN_REQUEST_ID_LEN: usize = 9;
pub const MAX_REQUEST_ID_LEN: usize = 60;

fn request_id_part(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Idempotency key for the export call. Retries within one run reuse it.
///
/// A description too long to fit is cut from the front, so the trailing year
/// keeps ids unique within a run.
pub fn request_id(description: &str, run_stamp: &str) -> String {
    let stamp: String = request_id_part(run_stamp)
        .chars()
        .take(MAX_REQUEST_ID_LEN / 2)
        .collect();
    let room = MAX_REQUEST_ID_LEN - stamp.len() - 1;

    // ASCII only after sanitizing, so byte offsets are char offsets.
    let description = request_id_part(description);
    let description = description[description.len().saturating_sub(room)..].trim_start_matches('-');

    let id = format!("{}-{}", description, stamp);
    if id.len() < MIN_REQUEST_ID_LEN {
        format!("export-{}", id)
    } else {
        id
    }
}

fn file_export_options<C: ConfigProvider>(config: &C, description: &str) -> FileExportOptions {
    let (drive_destination, cloud_storage_destination) = match config.destination() {
        Destination::Drive { folder } => (
            Some(DriveDestination {
                folder: folder.clone(),
                filename_prefix: description.to_string(),
            }),
            None,
        ),
        Destination::CloudStorage { bucket } => (
            None,
            Some(CloudStorageDestination {
                bucket: bucket.clone(),
                filename_prefix: description.to_string(),
            }),
        ),
    };

    FileExportOptions {
        file_format: config.file_format(),
        drive_destination,
        cloud_storage_destination,
    }
}

pub fn build_task<C: ConfigProvider>(config: &C, year: i32, run_stamp: &str) -> Result<ExportTask> {
    let date_range = date_range_for_year(year)?;
    let seed = seed_for_year(year);
    let description = description_for_year(config.description_prefix(), year);
    let sampling = config.sampling();

    let expression = expression::yearly_samples(
        &config.region(),
        config.collection_id(),
        config.band(),
        &date_range,
        seed,
        &sampling,
    );

    let request = TableExportRequest {
        expression,
        description: description.clone(),
        request_id: request_id(&description, run_stamp),
        file_export_options: file_export_options(config, &description),
    };

    Ok(ExportTask {
        year,
        date_range,
        seed,
        description,
        request,
    })
}

/// One task per configured year, in increasing year order.
pub fn plan_exports<C: ConfigProvider>(config: &C, run_stamp: &str) -> Result<Vec<ExportTask>> {
    let years = config.years();
    if years.is_empty() {
        return Err(ExportError::InvalidConfigValueError {
            field: "years".to_string(),
            value: format!("{}..={}", years.start, years.end),
            reason: "Year range is empty".to_string(),
        });
    }

    let tasks = years
        .years()
        .map(|year| build_task(config, year, run_stamp))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        "Planned {} exports ({} .. {})",
        tasks.len(),
        tasks.first().map(|t| t.description.as_str()).unwrap_or("-"),
        tasks.last().map(|t| t.description.as_str()).unwrap_or("-")
    );

    Ok(tasks)
}
