use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the cohort analytics pipeline.
#[derive(Error, Debug)]
pub enum InsightError {
    /// One or more required columns are absent from the input table.
    #[error("Missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A timestamp or numeric cell could not be coerced to its typed form.
    #[error("Cannot coerce column {column} at row {row} (value {value:?}): {reason}")]
    TypeCoercion {
        column: String,
        /// 1-based data row (header excluded).
        row: usize,
        value: String,
        reason: String,
    },

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input path does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No CSV files were found under the given directory.
    #[error("No CSV files found in {0}")]
    NoDataFiles(PathBuf),

    /// A CSV document could not be parsed.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be parsed or written.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InsightError {
    /// Shorthand for building a [`InsightError::TypeCoercion`].
    pub fn coercion(
        column: impl Into<String>,
        row: usize,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TypeCoercion {
            column: column.into(),
            row,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the cohort crates.
pub type Result<T> = std::result::Result<T, InsightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_schema_lists_every_column() {
        let err = InsightError::Schema {
            missing: vec!["group_code".to_string(), "logins".to_string()],
        };
        assert_eq!(err.to_string(), "Missing required columns: group_code, logins");
    }

    #[test]
    fn test_error_display_type_coercion() {
        let err = InsightError::coercion("session_day", 4, "tomorrow", "unrecognised timestamp");
        let msg = err.to_string();
        assert!(msg.contains("session_day"));
        assert!(msg.contains("row 4"));
        assert!(msg.contains("\"tomorrow\""));
        assert!(msg.contains("unrecognised timestamp"));
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = InsightError::FileRead {
            path: PathBuf::from("/data/sessions.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/sessions.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_no_data_files() {
        let err = InsightError::NoDataFiles(PathBuf::from("/empty/dir"));
        assert_eq!(err.to_string(), "No CSV files found in /empty/dir");
    }

    #[test]
    fn test_error_display_config() {
        let err = InsightError::Config("churn threshold must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: churn threshold must be positive"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: InsightError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: InsightError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
