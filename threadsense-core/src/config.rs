//! Runtime settings and the two JSON configuration files the scanner reads
//! once at startup: the analysis API list and the keyword list.

use crate::error::ConfigError;
use crate::types::ApiConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable naming the settings file.
pub const CONFIG_PATH_ENV: &str = "THREADSENSE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "threadsense.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub reddit_base_url: String,
    pub api_config_path: PathBuf,
    pub keyword_config_path: PathBuf,
    pub database_url: String,
    pub log_file: PathBuf,
    pub log_filter: String,
    pub request_timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub retry_budget: u32,
    pub retry_delay_ms: u64,
    pub max_pages: Option<u32>,
    pub accept_invalid_certs: bool,
}

/// Where loaded settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    File(PathBuf),
    /// The file was missing; the path is the one that was looked up.
    Defaults(PathBuf),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reddit_base_url: "https://www.reddit.com".to_string(),
            api_config_path: PathBuf::from("api.json"),
            keyword_config_path: PathBuf::from("keyword.json"),
            database_url: "sqlite://threadsense.db".to_string(),
            log_file: PathBuf::from("app.log"),
            log_filter: "threadsense=info,scan_service=info,analysis_engine=info,reddit_client=info"
                .to_string(),
            request_timeout_secs: 30,
            max_concurrent_fetches: 8,
            retry_budget: 10,
            retry_delay_ms: 500,
            max_pages: None,
            accept_invalid_certs: false,
        }
    }
}

impl Settings {
    /// Loads settings from the path in `THREADSENSE_CONFIG`, or
    /// `threadsense.toml` in the working directory.
    pub fn from_env() -> Result<(Self, SettingsSource), ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }

    /// A missing settings file yields the defaults; a present but malformed
    /// one is an error. The caller logs the returned source.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, SettingsSource), ConfigError> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let settings = Self::default();
                settings.validate()?;
                return Ok((settings, SettingsSource::Defaults(path.to_path_buf())));
            }
            Err(e) => {
                return Err(ConfigError::InvalidFormat {
                    path: path.display().to_string(),
                    details: e.to_string(),
                })
            }
        };

        let settings: Settings = toml::from_str(&raw)?;
        settings.validate()?;
        Ok((settings, SettingsSource::File(path.to_path_buf())))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reddit_base_url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "reddit_base_url".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent_fetches".to_string(),
                value: "0".to_string(),
            });
        }
        if self.retry_budget == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry_budget".to_string(),
                value: "0".to_string(),
            });
        }
        if self.max_pages == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_pages".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => ConfigError::InvalidFormat {
            path: path.display().to_string(),
            details: e.to_string(),
        },
    })?;

    serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidFormat {
        path: path.display().to_string(),
        details: e.to_string(),
    })
}

/// Reads the ordered list of analysis APIs.
pub fn load_api_configs(path: impl AsRef<Path>) -> Result<Vec<ApiConfig>, ConfigError> {
    let path = path.as_ref();
    let apis: Vec<ApiConfig> = read_json_file(path)?;
    validate_api_configs(&apis)?;
    info!("Loaded {} analysis APIs from {}", apis.len(), path.display());
    Ok(apis)
}

pub fn validate_api_configs(apis: &[ApiConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for api in apis {
        if api.name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "name".to_string(),
            });
        }
        if api.url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.url", api.name),
                value: api.url.clone(),
            });
        }
        if !seen.insert(api.name.as_str()) {
            return Err(ConfigError::ValidationFailed {
                reason: format!("duplicate API name '{}'", api.name),
            });
        }
    }
    Ok(())
}

/// Reads the ordered keyword list. Entries may be plain words or patterns.
pub fn load_keywords(path: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
    let path = path.as_ref();
    let keywords: Vec<String> = read_json_file(path)?;

    if keywords.is_empty() {
        return Err(ConfigError::ValidationFailed {
            reason: format!("{} contains no keywords", path.display()),
        });
    }
    if let Some(position) = keywords.iter().position(|k| k.trim().is_empty()) {
        return Err(ConfigError::InvalidValue {
            field: format!("keywords[{}]", position),
            value: keywords[position].clone(),
        });
    }

    info!("Loaded {} keywords from {}", keywords.len(), path.display());
    Ok(keywords)
}
