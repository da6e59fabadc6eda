use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Earth Engine API error {code} ({status}): {message}")]
    ApiError {
        code: u16,
        status: String,
        message: String,
    },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Export operation {operation} did not finish after {polls} status checks")]
    PollTimeout { operation: String, polls: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Remote,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExportError::HttpError(_) | ExportError::PollTimeout { .. } => ErrorCategory::Network,
            ExportError::ApiError { .. } => ErrorCategory::Remote,
            ExportError::ConfigValidationError { .. }
            | ExportError::InvalidConfigValueError { .. }
            | ExportError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ExportError::CsvError(_)
            | ExportError::SerializationError(_)
            | ExportError::ProcessingError { .. } => ErrorCategory::Data,
            ExportError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExportError::PollTimeout { .. } => ErrorSeverity::Low,
            ExportError::HttpError(_) => ErrorSeverity::Medium,
            ExportError::ApiError { code, .. } if *code == 429 || *code >= 500 => {
                ErrorSeverity::Medium
            }
            ExportError::ApiError { .. }
            | ExportError::ConfigValidationError { .. }
            | ExportError::InvalidConfigValueError { .. }
            | ExportError::MissingConfigError { .. }
            | ExportError::CsvError(_)
            | ExportError::SerializationError(_)
            | ExportError::ProcessingError { .. } => ErrorSeverity::High,
            ExportError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Whether a request that failed with this error may be sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExportError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ExportError::ApiError { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ExportError::HttpError(_) => "Check network connectivity and the api_base_url setting",
            ExportError::ApiError { code: 401, .. } | ExportError::ApiError { code: 403, .. } => {
                "Refresh the access token (e.g. `gcloud auth print-access-token`) and check the project has Earth Engine enabled"
            }
            ExportError::ApiError { code: 429, .. } => {
                "Export quota exceeded; wait for running tasks to finish and retry the failed years"
            }
            ExportError::ApiError { .. } => "Inspect the task in the Earth Engine console",
            ExportError::CsvError(_) => "Make sure the input files are the CSV tables produced by the export",
            ExportError::IoError(_) => "Check file permissions and that the paths exist",
            ExportError::SerializationError(_) => "The response or manifest is not valid JSON",
            ExportError::ConfigValidationError { .. }
            | ExportError::InvalidConfigValueError { .. } => "Fix the configuration value and run again",
            ExportError::MissingConfigError { .. } => "Add the missing setting to the TOML file or pass it on the command line",
            ExportError::ProcessingError { .. } => "Check the exported data for missing columns",
            ExportError::PollTimeout { .. } => "The task is still running; check it later in the Earth Engine console",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ExportError::HttpError(_) => format!("Could not reach Earth Engine: {}", self),
            ExportError::ApiError { message, .. } => format!("Earth Engine rejected the request: {}", message),
            ExportError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting `{}`: {}", field, reason)
            }
            ExportError::MissingConfigError { field } => format!("Missing setting `{}`", field),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
