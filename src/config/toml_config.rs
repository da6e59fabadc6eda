use crate::adapters::earth_engine::{ClientSettings, DEFAULT_API_BASE_URL};
use crate::core::engine::WaitOptions;
use crate::core::plan::DEFAULT_DESCRIPTION_PREFIX;
use crate::core::ConfigProvider;
use crate::domain::model::{BoundingBox, Destination, FileFormat, SamplingParams, YearRange};
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_COLLECTION_ID: &str = "NOAA/VIIRS/DNB/MONTHLY_V1/VCMSLCFG";
pub const DEFAULT_BAND: &str = "avg_rad";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub project: ProjectConfig,
    pub auth: AuthConfig,
    pub region: BoundingBox,
    pub collection: CollectionConfig,
    pub years: YearRange,
    pub sampling: SamplingParams,
    pub export: ExportSection,
    pub http: HttpConfig,
    pub wait: WaitConfig,
    pub output: OutputConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub id: String,
    pub api_base_url: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth2 access token, usually `${EE_ACCESS_TOKEN}`.
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub id: String,
    pub band: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_COLLECTION_ID.to_string(),
            band: DEFAULT_BAND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub description_prefix: String,
    pub file_format: FileFormat,
    pub destination: Destination,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            description_prefix: DEFAULT_DESCRIPTION_PREFIX.to_string(),
            file_format: FileFormat::Csv,
            destination: Destination::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_seconds: u64,
    pub max_retry_delay_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            retry_attempts: 3,
            retry_delay_seconds: 2,
            max_retry_delay_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub enabled: bool,
    pub poll_interval_seconds: u64,
    pub max_polls: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_seconds: 30,
            max_polls: 240,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the run manifest is written to.
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex"))
}

impl ExportConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);

        toml::from_str(&processed).map_err(|e| ExportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left untouched so validation can report them.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("project.id", &self.project.id)?;
        validation::validate_url("project.api_base_url", &self.project.api_base_url)?;

        let region = &self.region;
        validation::validate_range("region.west", region.west, -180.0, 180.0)?;
        validation::validate_range("region.east", region.east, -180.0, 180.0)?;
        validation::validate_range("region.south", region.south, -90.0, 90.0)?;
        validation::validate_range("region.north", region.north, -90.0, 90.0)?;
        if region.west >= region.east || region.south >= region.north {
            return Err(ExportError::InvalidConfigValueError {
                field: "region".to_string(),
                value: format!("{:?}", region.corners()),
                reason: "Expected west < east and south < north".to_string(),
            });
        }

        validation::validate_non_empty_string("collection.id", &self.collection.id)?;
        validation::validate_non_empty_string("collection.band", &self.collection.band)?;

        // The Date constructor needs Jan 1 of end + 1 to exist as well.
        validation::validate_range("years.start", self.years.start, 1970, 9998)?;
        validation::validate_range("years.end", self.years.end, 1970, 9998)?;
        if self.years.is_empty() {
            return Err(ExportError::InvalidConfigValueError {
                field: "years".to_string(),
                value: format!("{}..={}", self.years.start, self.years.end),
                reason: "Start year must not be after end year".to_string(),
            });
        }

        validation::validate_positive_number("sampling.points", self.sampling.points, 1)?;
        if !(self.sampling.scale.is_finite() && self.sampling.scale > 0.0) {
            return Err(ExportError::InvalidConfigValueError {
                field: "sampling.scale".to_string(),
                value: self.sampling.scale.to_string(),
                reason: "Scale must be a positive number of metres".to_string(),
            });
        }

        // The longest description the prefix can produce is prefix + 4 digits.
        validation::validate_task_description(
            "export.description_prefix",
            &format!("{}{}", self.export.description_prefix, self.years.end),
        )?;
        if let Destination::CloudStorage { bucket } = &self.export.destination {
            validation::validate_non_empty_string("export.destination.bucket", bucket)?;
        }

        validation::validate_positive_number("http.timeout_seconds", self.http.timeout_seconds, 1)?;
        if self.wait.enabled {
            validation::validate_positive_number("wait.max_polls", u64::from(self.wait.max_polls), 1)?;
        }
        validation::validate_path("output.path", &self.output.path)?;

        Ok(())
    }

    /// Returns the access token, rejecting placeholders whose environment
    /// variable was not set.
    pub fn access_token(&self) -> Result<&str> {
        let token = validation::validate_required_field("auth.access_token", &self.auth.access_token)?;
        if token.trim().is_empty() || env_var_pattern().is_match(token) {
            return Err(ExportError::MissingConfigError {
                field: "auth.access_token".to_string(),
            });
        }
        Ok(token)
    }

    pub fn client_settings(&self) -> Result<ClientSettings> {
        Ok(ClientSettings {
            api_base_url: self.project.api_base_url.clone(),
            project: self.project.id.clone(),
            access_token: self.access_token()?.to_string(),
            request_timeout: Duration::from_secs(self.http.timeout_seconds),
            retry_attempts: self.http.retry_attempts,
            retry_delay: Duration::from_secs(self.http.retry_delay_seconds),
            max_retry_delay: Duration::from_secs(self.http.max_retry_delay_seconds),
        })
    }

    pub fn wait_options(&self) -> Option<WaitOptions> {
        self.wait.enabled.then(|| WaitOptions {
            poll_interval: Duration::from_secs(self.wait.poll_interval_seconds),
            max_polls: self.wait.max_polls,
        })
    }

    pub fn output_path(&self) -> &str {
        &self.output.path
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl ConfigProvider for ExportConfig {
    fn project(&self) -> &str {
        &self.project.id
    }

    fn region(&self) -> BoundingBox {
        self.region
    }

    fn collection_id(&self) -> &str {
        &self.collection.id
    }

    fn band(&self) -> &str {
        &self.collection.band
    }

    fn years(&self) -> YearRange {
        self.years
    }

    fn sampling(&self) -> SamplingParams {
        self.sampling.clone()
    }

    fn description_prefix(&self) -> &str {
        &self.export.description_prefix
    }

    fn file_format(&self) -> FileFormat {
        self.export.file_format
    }

    fn destination(&self) -> &Destination {
        &self.export.destination
    }
}

impl Validate for ExportConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
