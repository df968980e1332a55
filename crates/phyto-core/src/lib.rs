//! Phyto Core - Shared types for plant-name annotation and linking
//!
//! This crate defines the abstractions used throughout the phyto system:
//! - IOB tag model (`Tag`)
//! - Entity spans reconstructed from tag streams (`Span`, `SpanLocation`)
//! - Common error types
//! - Configuration management
//!
//! Author: hephaex@gmail.com

pub mod config;

pub use config::{
    AnnotationConfig, AppConfig, ConfigError, LinkerConfig, LoggingConfig, SpanLengthRule,
};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for phyto operations
#[derive(Error, Debug)]
pub enum PhytoError {
    #[error("Duplicate gazetteer category '{category}' ({first} and {second})")]
    DuplicateCategory {
        category: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("IO error reading {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is not valid UTF-8 text: {0}")]
    Encoding(PathBuf),

    #[error("Format error at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("Invalid IOB tag: '{0}'")]
    InvalidTag(String),

    #[error("Lookup table error: {0}")]
    Lookup(String),

    #[error("Name service error: {0}")]
    Service(String),

    #[error("Name service request timed out after {0}s")]
    Timeout(u64),

    #[error("Inconsistent tag state: {0}")]
    InconsistentState(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PhytoError>;

// ============================================================================
// IOB Tags
// ============================================================================

/// Per-token label in the IOB scheme
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// `O`: token is outside any entity
    Outside,
    /// `B-<category>`: token begins an entity
    Begin(String),
    /// `I-<category>`: token continues the entity begun before it
    Inside(String),
}

impl Tag {
    pub fn begin(category: impl Into<String>) -> Self {
        Self::Begin(category.into())
    }

    pub fn inside(category: impl Into<String>) -> Self {
        Self::Inside(category.into())
    }

    /// Category carried by a `B-`/`I-` tag
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Outside => None,
            Self::Begin(c) | Self::Inside(c) => Some(c),
        }
    }

    pub fn is_outside(&self) -> bool {
        matches!(self, Self::Outside)
    }

    pub fn is_begin(&self) -> bool {
        matches!(self, Self::Begin(_))
    }

    /// True if this is `I-<category>` for the given category
    pub fn continues(&self, category: &str) -> bool {
        matches!(self, Self::Inside(c) if c == category)
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outside => write!(f, "O"),
            Self::Begin(c) => write!(f, "B-{c}"),
            Self::Inside(c) => write!(f, "I-{c}"),
        }
    }
}

impl FromStr for Tag {
    type Err = PhytoError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "O" {
            return Ok(Self::Outside);
        }
        match s.split_once('-') {
            Some(("B", category)) if !category.is_empty() => Ok(Self::begin(category)),
            Some(("I", category)) if !category.is_empty() => Ok(Self::inside(category)),
            _ => Err(PhytoError::InvalidTag(s.to_string())),
        }
    }
}

impl Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Spans
// ============================================================================

/// Sentence-relative position of a span
///
/// Serializes as a bare index for single-token spans and as an inclusive
/// `[start, end]` pair otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpanLocation {
    Single(usize),
    Range(usize, usize),
}

impl SpanLocation {
    pub fn start(&self) -> usize {
        match *self {
            Self::Single(i) | Self::Range(i, _) => i,
        }
    }

    /// Last covered index (inclusive)
    pub fn end(&self) -> usize {
        match *self {
            Self::Single(i) | Self::Range(_, i) => i,
        }
    }

    pub fn token_count(&self) -> usize {
        self.end() - self.start() + 1
    }
}

/// Whether a candidate spans one token or several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NgramType {
    Unigram,
    Ngram,
}

/// A contiguous run of tokens tagged as one entity mention
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Surface string (tokens joined by a single space)
    pub text: String,

    /// Entity category (gazetteer name)
    pub category: String,

    /// 1-based ordinal of the owning sentence
    pub sentence: usize,

    /// Token offsets within the sentence
    pub location: SpanLocation,
}

impl Span {
    /// Build a span from its tokens, choosing the location shape by length
    pub fn from_tokens(
        tokens: &[&str],
        category: impl Into<String>,
        sentence: usize,
        start: usize,
    ) -> Self {
        let location = if tokens.len() <= 1 {
            SpanLocation::Single(start)
        } else {
            SpanLocation::Range(start, start + tokens.len() - 1)
        };
        Self {
            text: tokens.join(" "),
            category: category.into(),
            sentence,
            location,
        }
    }

    pub fn ngram_type(&self) -> NgramType {
        match self.location {
            SpanLocation::Single(_) => NgramType::Unigram,
            SpanLocation::Range(..) => NgramType::Ngram,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
