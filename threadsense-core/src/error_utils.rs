use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    /// Whether the error must stop the process rather than skip one item.
    fn is_fatal(&self) -> bool;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            CoreError::Database(e) => {
                error!("Database error details: {:?}", e);
            }
            CoreError::Parse(e) => {
                error!("Parse error details: {:?}", e);
            }
            CoreError::Io(e) => {
                error!("IO error details: kind={:?} {:?}", e.kind(), e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        match self {
            CoreError::Config(e) => e.is_fatal(),
            CoreError::Database(e) => e.is_fatal(),
            CoreError::Parse(e) => e.is_fatal(),
            CoreError::Io(_) => true,
            CoreError::Serialization(_) => false,
            CoreError::Internal { .. } => true,
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Database(_) => "DATABASE".to_string(),
            CoreError::Parse(_) => "PARSE".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for ParseError {
    fn log_error(&self) -> &Self {
        error!("ParseError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ParseError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        false // a bad URL or page only ever skips that item
    }

    fn error_code(&self) -> String {
        match self {
            ParseError::InvalidPermalink { .. } => "PARSE_INVALID_PERMALINK".to_string(),
            ParseError::UnexpectedShape { .. } => "PARSE_UNEXPECTED_SHAPE".to_string(),
            ParseError::EmptySegment { .. } => "PARSE_EMPTY_SEGMENT".to_string(),
            ParseError::MalformedListing { .. } => "PARSE_MALFORMED_LISTING".to_string(),
            ParseError::MissingField { .. } => "PARSE_MISSING_FIELD".to_string(),
            ParseError::ForeignHost { .. } => "PARSE_FOREIGN_HOST".to_string(),
        }
    }
}

impl ErrorExt for DatabaseError {
    fn log_error(&self) -> &Self {
        error!("DatabaseError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("DatabaseError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed { .. } | DatabaseError::MigrationFailed { .. }
        )
    }

    fn error_code(&self) -> String {
        match self {
            DatabaseError::ConnectionFailed { .. } => "DB_CONNECTION_FAILED".to_string(),
            DatabaseError::MigrationFailed { .. } => "DB_MIGRATION_FAILED".to_string(),
            DatabaseError::CorruptRecord { .. } => "DB_CORRUPT_RECORD".to_string(),
            DatabaseError::Sql(_) => "DB_SQL_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_fatal(&self) -> bool {
        true
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidFormat { .. } => "CONFIG_INVALID_FORMAT".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Final report for an error that ends the run.
#[derive(Debug, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("Error code: {}", error.error_code());
        if error.is_fatal() {
            error!(code = %error.error_code(), "Fatal error, shutting down: {}", error);
        }
    }
}
