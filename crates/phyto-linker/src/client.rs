//! Taxonomic name service client
//!
//! Author: hephaex@gmail.com

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use phyto_core::{LinkerConfig, PhytoError, Result};

/// Default Catalogue of Life webservice endpoint
pub const DEFAULT_BASE_URL: &str = "http://webservice.catalogueoflife.org/col/webservice";

// ============================================================================
// Response Types
// ============================================================================

/// Answer of the name service for one queried name
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    /// The name as received by the service
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub total_number_of_results: u64,

    #[serde(default)]
    pub results: Vec<ColResult>,
}

impl SearchResponse {
    /// First result, if the service found anything
    pub fn best(&self) -> Option<&ColResult> {
        if self.total_number_of_results == 0 {
            return None;
        }
        self.results.first()
    }
}

/// A single taxon record
///
/// Synonyms and common names carry the accepted taxon in `accepted_name`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub name_status: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub bibliographic_citation: Option<String>,
    #[serde(default)]
    pub accepted_name: Option<Box<ColResult>>,
}

// ============================================================================
// Service Trait
// ============================================================================

/// A name-resolution backend queried by the entity linker
#[async_trait]
pub trait TaxonomyService: Send + Sync {
    async fn search(&self, name: &str) -> Result<SearchResponse>;
}

// ============================================================================
// Catalogue of Life Client
// ============================================================================

/// HTTP client for the Catalogue of Life webservice
pub struct ColClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl ColClient {
    /// Create a client with an explicit request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PhytoError::Service(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Create from config
    pub fn from_config(config: &LinkerConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TaxonomyService for ColClient {
    async fn search(&self, name: &str) -> Result<SearchResponse> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("name", name), ("format", "json")])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PhytoError::Timeout(self.timeout_secs)
                } else {
                    PhytoError::Service(format!("Request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(PhytoError::Service(format!(
                "Name service returned {} for '{name}'",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PhytoError::Service(format!("Failed to parse response: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
