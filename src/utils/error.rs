use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Lock poisoned: {resource}")]
    LockPoisoned { resource: String },
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Storage,
    Data,
    Domain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReportError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::SpreadsheetError(_) | Self::CsvError(_) | Self::IoError(_) => {
                ErrorCategory::Input
            }
            Self::DatabaseError(_) | Self::LockPoisoned { .. } => ErrorCategory::Storage,
            Self::SerializationError(_) | Self::ProcessingError { .. } => ErrorCategory::Data,
            Self::ValidationError { .. } | Self::NotFound { .. } | Self::InvalidState { .. } => {
                ErrorCategory::Domain
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } | Self::ValidationError { .. } => ErrorSeverity::Low,
            Self::InvalidState { .. } | Self::SpreadsheetError(_) | Self::CsvError(_) => {
                ErrorSeverity::Medium
            }
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::TomlError(_)
            | Self::ProcessingError { .. }
            | Self::SerializationError(_) => ErrorSeverity::High,
            Self::DatabaseError(_) | Self::IoError(_) | Self::LockPoisoned { .. } => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the TOML configuration file and command line arguments"
            }
            ErrorCategory::Input => {
                "Make sure the data directory contains readable .xls/.xlsx/.csv exports"
            }
            ErrorCategory::Storage => {
                "Check that the database file is writable and not locked by another process"
            }
            ErrorCategory::Data => "Inspect the source spreadsheet for malformed rows",
            ErrorCategory::Domain => "Review the request and try again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => format!("Could not find {} '{}'", resource, id),
            Self::ValidationError { message } => format!("Some fields are invalid: {}", message),
            Self::IoError(e) => format!("Could not read or write a file: {}", e),
            other => other.to_string(),
        }
    }
}
