use crate::config::toml_config::ExportConfig;
use crate::domain::model::Destination;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "viirs-export")]
#[command(about = "Submit yearly VIIRS nighttime-lights sample exports to Earth Engine")]
pub struct ExportArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "viirs-export.toml")]
    pub config: PathBuf,

    /// Earth Engine cloud project
    #[arg(long, env = "EE_PROJECT")]
    pub project: Option<String>,

    /// OAuth2 access token (e.g. from `gcloud auth print-access-token`)
    #[arg(long, env = "EE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// First year to export
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Last year to export (inclusive)
    #[arg(long)]
    pub end_year: Option<i32>,

    /// Export to this Google Drive folder
    #[arg(long, conflicts_with = "bucket")]
    pub drive_folder: Option<String>,

    /// Export to this Cloud Storage bucket instead of Drive
    #[arg(long)]
    pub bucket: Option<String>,

    /// Directory for the run manifest
    #[arg(short, long)]
    pub output: Option<String>,

    /// Poll each export until it finishes
    #[arg(long)]
    pub wait: bool,

    /// Seconds between status checks when waiting
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Print the requests that would be submitted without sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Log process CPU and memory after each submission
    #[arg(long)]
    pub monitor: bool,
}

impl ExportArgs {
    /// Loads the configuration file, falling back to built-in defaults when
    /// the default path does not exist, then applies command-line overrides.
    pub fn load_config(&self) -> crate::utils::error::Result<ExportConfig> {
        let mut config = if self.config.exists() {
            tracing::info!("📁 Loading configuration from: {}", self.config.display());
            ExportConfig::from_file(&self.config)?
        } else if self.config == PathBuf::from("viirs-export.toml") {
            tracing::info!("📁 No configuration file found, using built-in defaults");
            ExportConfig::default()
        } else {
            return Err(crate::utils::error::ExportError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Config file not found: {}", self.config.display()),
            )));
        };

        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut ExportConfig) {
        if let Some(project) = &self.project {
            config.project.id = project.clone();
        }
        if let Some(token) = &self.access_token {
            config.auth.access_token = Some(token.clone());
        }
        if let Some(start) = self.start_year {
            config.years.start = start;
        }
        if let Some(end) = self.end_year {
            config.years.end = end;
        }
        if let Some(folder) = &self.drive_folder {
            config.export.destination = Destination::Drive {
                folder: Some(folder.clone()),
            };
        }
        if let Some(bucket) = &self.bucket {
            config.export.destination = Destination::CloudStorage {
                bucket: bucket.clone(),
            };
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if self.wait {
            config.wait.enabled = true;
        }
        if let Some(interval) = self.poll_interval {
            config.wait.poll_interval_seconds = interval;
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_file_values() {
        let args = ExportArgs::parse_from([
            "viirs-export",
            "--project",
            "cli-project",
            "--start-year",
            "2020",
            "--end-year",
            "2021",
            "--bucket",
            "night-bucket",
            "--wait",
            "--poll-interval",
            "7",
        ]);

        let mut config = ExportConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.project.id, "cli-project");
        assert_eq!(config.years.start, 2020);
        assert_eq!(config.years.end, 2021);
        assert_eq!(
            config.export.destination,
            Destination::CloudStorage {
                bucket: "night-bucket".to_string()
            }
        );
        assert!(config.wait.enabled);
        assert_eq!(config.wait.poll_interval_seconds, 7);
    }

    #[test]
    fn test_drive_and_bucket_conflict() {
        let parsed = ExportArgs::try_parse_from([
            "viirs-export",
            "--drive-folder",
            "a",
            "--bucket",
            "b",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let args = ExportArgs::parse_from(["viirs-export", "--config", "/definitely/not/here.toml"]);
        assert!(args.load_config().is_err());
    }
}
