use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Invalid permalink {url}: expected 7 path segments, got {segments}")]
    InvalidPermalink { url: String, segments: usize },

    #[error("Permalink {url} does not have the /r/<community>/comments/<id>/<slug>/ shape")]
    UnexpectedShape { url: String },

    #[error("Permalink {url} has an empty {segment} segment")]
    EmptySegment { url: String, segment: String },

    #[error("Malformed listing: {details}")]
    MalformedListing { details: String },

    #[error("Listing item is missing required field: {field}")]
    MissingField { field: String },

    #[error("Permalink {url} is on host {host}, not the listing site")]
    ForeignHost { url: String, host: String },
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Migration failed: {migration}")]
    MigrationFailed { migration: String },

    #[error("Stored record {id} could not be decoded")]
    CorruptRecord { id: String },

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format in {path}: {details}")]
    InvalidFormat { path: String, details: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
