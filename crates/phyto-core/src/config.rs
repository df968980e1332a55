//! Phyto Configuration Management
//!
//! Handles configuration from environment variables, TOML config files,
//! and command-line arguments with defaults matching the historical
//! annotation setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Gazetteer loading and tagging
    pub annotation: AnnotationConfig,

    /// Taxonomic name service and lookup fallback
    pub linker: LinkerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Annotation
        if let Ok(dirs) = std::env::var("PHYTO_GAZETTEER_DIRS") {
            self.annotation.gazetteer_dirs = std::env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Ok(ext) = std::env::var("PHYTO_GAZETTEER_EXT") {
            let ext = ext.trim().trim_start_matches('.').to_string();
            self.annotation.gazetteer_extension = (!ext.is_empty()).then_some(ext);
        }

        // Linker
        if let Ok(url) = std::env::var("COL_BASE_URL") {
            self.linker.base_url = url;
        }
        if let Ok(secs) = std::env::var("COL_TIMEOUT_SECS") {
            self.linker.timeout_secs = parse_env("COL_TIMEOUT_SECS", secs)?;
        }
        if let Ok(n) = std::env::var("LINKER_CONCURRENCY") {
            self.linker.concurrency = parse_env("LINKER_CONCURRENCY", n)?;
        }
        if let Ok(flag) = std::env::var("LINKER_USE_LOOKUP") {
            self.linker.use_lookup = parse_env("LINKER_USE_LOOKUP", flag)?;
        }
        if let Ok(path) = std::env::var("LOOKUP_TABLE") {
            self.linker.lookup_table = Some(PathBuf::from(path));
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// How the longest entry of a gazetteer is measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanLengthRule {
    /// `1 + max interior spaces`: the real token count of the longest entry
    #[default]
    Tokens,
    /// `max(1, max interior spaces)`: reproduces the historical annotated
    /// corpora, where two-token entries left a gazetteer classified unigram
    LegacySpaces,
}

impl std::str::FromStr for SpanLengthRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "tokens" => Ok(Self::Tokens),
            "legacy_spaces" | "legacy" => Ok(Self::LegacySpaces),
            _ => Err(ConfigError::InvalidValue {
                key: "span_length_rule".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Gazetteer loading and tagging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Directories holding one gazetteer file per category
    pub gazetteer_dirs: Vec<PathBuf>,

    /// Only load files with this extension (e.g. "txt"); all files if unset
    pub gazetteer_extension: Option<String>,

    /// Rule for classifying gazetteers as unigram or multiword
    pub span_length_rule: SpanLengthRule,

    /// Categories that win overlaps before all others, in this order
    pub priority: Vec<String>,
}

/// Taxonomic name service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Name search endpoint (queried with `name` and `format=json`)
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retry unresolved names through the vernacular lookup table
    pub use_lookup: bool,

    /// Tab-separated vernacular -> scientific name table
    pub lookup_table: Option<PathBuf>,

    /// Maximum number of in-flight name queries
    pub concurrency: usize,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://webservice.catalogueoflife.org/col/webservice".to_string(),
            timeout_secs: 30,
            use_lookup: true,
            lookup_table: None,
            concurrency: 4,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
