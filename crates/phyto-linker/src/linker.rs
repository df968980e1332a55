//! Entity linking against a taxonomic name service
//!
//! Each candidate name is queried once. When the service has no result,
//! or the request fails, the lookup table may supply one scientific name
//! for a single retry. Nothing found is a normal outcome, not an error.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use phyto_core::{LinkerConfig, PhytoError, Result};

use crate::client::{ColResult, SearchResponse, TaxonomyService};
use crate::lookup::LookupTable;

// ============================================================================
// Taxon Records
// ============================================================================

/// Nomenclatural status reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonStatus {
    Accepted,
    Synonym,
    CommonName,
    Other(String),
}

impl TaxonStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "accepted name" => Self::Accepted,
            "synonym" => Self::Synonym,
            "common name" => Self::CommonName,
            other => Self::Other(other.to_string()),
        }
    }

    /// The status string as the service spells it
    pub fn as_str(&self) -> &str {
        match self {
            Self::Accepted => "accepted name",
            Self::Synonym => "synonym",
            Self::CommonName => "common name",
            Self::Other(raw) => raw,
        }
    }

    /// Statuses whose taxonomic data lives in the nested accepted name
    fn resolves_through_accepted(&self) -> bool {
        matches!(self, Self::Synonym | Self::CommonName)
    }
}

/// Taxonomic fields of a linked name; every field is empty when unresolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaxonRecord {
    pub id: String,
    pub rank: String,
    pub scientific_name: String,
    pub status: String,
    pub bibliographic_citation: String,
    pub url: String,
}

impl TaxonRecord {
    /// Extract the record from the best service result
    ///
    /// Common names take all fields from the accepted name. Synonyms keep
    /// their own rank and take the rest from the accepted name. Any other
    /// status is read from the result itself. A status that points to an
    /// accepted name the service did not send falls back to the result.
    pub fn from_result(result: &ColResult) -> Self {
        let raw_status = result.name_status.clone().unwrap_or_default();
        let status = TaxonStatus::parse(&raw_status);

        let source = match (&result.accepted_name, status.resolves_through_accepted()) {
            (Some(accepted), true) => accepted.as_ref(),
            _ => result,
        };
        let rank = match status {
            TaxonStatus::Synonym => result.rank.clone(),
            _ => source.rank.clone(),
        };

        Self {
            id: source.id.clone().unwrap_or_default(),
            rank: rank.unwrap_or_default(),
            scientific_name: source.name.clone().unwrap_or_default(),
            status: raw_status,
            bibliographic_citation: source.bibliographic_citation.clone().unwrap_or_default(),
            url: source.url.clone().unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.scientific_name.is_empty()
    }
}

// ============================================================================
// Link Results
// ============================================================================

/// How linking a candidate ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The service found the name, directly or via the lookup fallback
    Resolved { via_fallback: bool },
    /// The service found nothing or did not answer in time
    Unresolved,
    /// The service could not be reached or answered with an error
    Failed(String),
}

impl LinkOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Result of linking one candidate name
#[derive(Debug, Clone)]
pub struct LinkResult {
    /// The candidate as found in the text
    pub candidate: String,
    /// The last name submitted to the service
    pub query_name: String,
    pub record: TaxonRecord,
    pub outcome: LinkOutcome,
}

impl LinkResult {
    fn resolved(
        candidate: &str,
        query_name: &str,
        result: &ColResult,
        via_fallback: bool,
    ) -> Self {
        Self {
            candidate: candidate.to_string(),
            query_name: query_name.to_string(),
            record: TaxonRecord::from_result(result),
            outcome: LinkOutcome::Resolved { via_fallback },
        }
    }

    fn empty(candidate: &str, query_name: &str, outcome: LinkOutcome) -> Self {
        Self {
            candidate: candidate.to_string(),
            query_name: query_name.to_string(),
            record: TaxonRecord::default(),
            outcome,
        }
    }
}

// ============================================================================
// Entity Linker
// ============================================================================

/// Links candidate names to taxonomic records
pub struct EntityLinker {
    service: Arc<dyn TaxonomyService>,
    lookup: Option<LookupTable>,
    timeout: Duration,
    concurrency: usize,
}

impl EntityLinker {
    pub fn new(service: Arc<dyn TaxonomyService>) -> Self {
        let defaults = LinkerConfig::default();
        Self {
            service,
            lookup: None,
            timeout: Duration::from_secs(defaults.timeout_secs),
            concurrency: defaults.concurrency,
        }
    }

    /// Create from config; the lookup table is only used if enabled there
    pub fn from_config(
        service: Arc<dyn TaxonomyService>,
        config: &LinkerConfig,
        lookup: Option<LookupTable>,
    ) -> Self {
        let mut linker = Self::new(service)
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_concurrency(config.concurrency);
        if config.use_lookup {
            if let Some(table) = lookup {
                linker = linker.with_lookup(table);
            }
        }
        linker
    }

    /// Set the vernacular to scientific fallback table
    pub fn with_lookup(mut self, lookup: LookupTable) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of candidates linked at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Link one candidate name
    pub async fn link(&self, candidate: &str) -> LinkResult {
        let error = match self.query(candidate).await {
            Ok(response) => match response.best() {
                Some(best) => return LinkResult::resolved(candidate, candidate, best, false),
                None => None,
            },
            Err(e) => {
                warn!(candidate, "Name service query failed: {e}");
                Some(e)
            }
        };

        let Some(fallback) = self.fallback_name(candidate) else {
            debug!(candidate, "No lookup entry");
            let outcome = error.map_or(LinkOutcome::Unresolved, failure_outcome);
            return LinkResult::empty(candidate, candidate, outcome);
        };

        debug!(candidate, fallback, "Retrying with lookup candidate");
        match self.query(fallback).await {
            Ok(response) => match response.best() {
                Some(best) => LinkResult::resolved(candidate, fallback, best, true),
                None => LinkResult::empty(candidate, fallback, LinkOutcome::Unresolved),
            },
            Err(e) => {
                warn!(candidate, fallback, "Fallback query failed: {e}");
                LinkResult::empty(candidate, fallback, failure_outcome(e))
            }
        }
    }

    /// Link many candidates with bounded concurrency
    ///
    /// Results come back in input order regardless of completion order.
    pub async fn link_all<S: AsRef<str>>(&self, candidates: &[S]) -> Vec<LinkResult> {
        let mut slots: Vec<Option<LinkResult>> = (0..candidates.len()).map(|_| None).collect();

        let mut pending = stream::iter(candidates.iter().enumerate())
            .map(|(ordinal, candidate)| async move {
                (ordinal, self.link(candidate.as_ref()).await)
            })
            .buffer_unordered(self.concurrency);

        while let Some((ordinal, result)) = pending.next().await {
            slots[ordinal] = Some(result);
        }

        slots.into_iter().flatten().collect()
    }

    async fn query(&self, name: &str) -> Result<SearchResponse> {
        tokio::time::timeout(self.timeout, self.service.search(name))
            .await
            .map_err(|_| PhytoError::Timeout(self.timeout.as_secs()))?
    }

    fn fallback_name(&self, candidate: &str) -> Option<&str> {
        self.lookup.as_ref()?.first_candidate(candidate)
    }
}

/// A timed-out query counts as unresolved; any other service error as failed
fn failure_outcome(error: PhytoError) -> LinkOutcome {
    match error {
        PhytoError::Timeout(_) => LinkOutcome::Unresolved,
        other => LinkOutcome::Failed(other.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
