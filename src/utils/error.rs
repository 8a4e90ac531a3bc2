use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalcError {
    #[error("Upstream store failure during {operation}: {message}")]
    UpstreamFailure { operation: String, message: String },

    #[error("{}", standard_not_found_message(.jurisdiction, .year.as_deref()))]
    StandardNotFound {
        jurisdiction: String,
        year: Option<String>,
    },

    #[error("A calculation run is already in progress")]
    RunInProgress,

    #[error("Validation failed with {} row error(s)", .errors.len())]
    ValidationFailure { errors: Vec<RowError> },

    #[error("No valid rows to import")]
    EmptyImport,

    #[error("Cannot import {file}: {reason}")]
    UnsupportedFile { file: String, reason: String },

    #[error("Spreadsheet processing error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Salaries for {employee} are too large to compute the {step}")]
    ArithmeticOverflow { employee: String, step: String },

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
}

/// 單行匯入錯誤，行號以 1 起算並已包含表頭
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

fn standard_not_found_message(jurisdiction: &str, year: Option<&str>) -> String {
    match year {
        Some(year) => format!(
            "no contribution standard found for {} (year {})",
            jurisdiction, year
        ),
        None => format!(
            "no contribution standard found for {} (latest year)",
            jurisdiction
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Upstream,
    Data,
    Concurrency,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CalcError {
    pub fn upstream(operation: &str, err: impl std::fmt::Display) -> Self {
        CalcError::UpstreamFailure {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CalcError::UpstreamFailure { .. } => ErrorCategory::Upstream,
            CalcError::StandardNotFound { .. }
            | CalcError::ValidationFailure { .. }
            | CalcError::EmptyImport
            | CalcError::UnsupportedFile { .. }
            | CalcError::SpreadsheetError(_)
            | CalcError::ArithmeticOverflow { .. }
            | CalcError::CsvError(_) => ErrorCategory::Data,
            CalcError::RunInProgress => ErrorCategory::Concurrency,
            CalcError::ConfigValidationError { .. } | CalcError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            CalcError::IoError(_) | CalcError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Concurrency => ErrorSeverity::Medium,
            ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CalcError::ValidationFailure { errors } => {
                let mut lines = vec![format!("Import rejected, {} row(s) invalid:", errors.len())];
                lines.extend(errors.iter().map(|e| format!("  - {}", e)));
                lines.join("\n")
            }
            CalcError::UpstreamFailure { operation, message } => {
                format!("Data store error while trying to {}: {}", operation, message)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CalcError::UpstreamFailure { .. } => "Check that the data directory is readable and writable, then retry",
            CalcError::StandardNotFound { .. } => "Import a standard for this jurisdiction/year with `import-standards`",
            CalcError::RunInProgress => "Wait for the current run to finish and retry",
            CalcError::ValidationFailure { .. } => "Fix the listed rows and import the file again",
            CalcError::EmptyImport => "Make sure the file has a header row and at least one data row",
            CalcError::UnsupportedFile { .. } => "Upload a .csv, .xlsx or .xls file",
            CalcError::SpreadsheetError(_) => "Re-save the workbook and make sure the data is on the first sheet",
            CalcError::ArithmeticOverflow { .. } => "Check the imported salary amounts for misplaced digits",
            CalcError::CsvError(_) => "Make sure the file is valid UTF-8 CSV",
            CalcError::IoError(_) => "Check file paths and permissions",
            CalcError::SerializationError(_) => "Check that stored data has not been edited by hand",
            CalcError::ConfigValidationError { .. } | CalcError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line flags"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
