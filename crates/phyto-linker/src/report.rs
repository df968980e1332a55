//! Linking report
//!
//! Groups extracted spans by surface string, links every distinct
//! candidate once and renders the `plant_names` JSON document together
//! with the run counters.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use phyto_core::{NgramType, PhytoError, Result, Span, SpanLocation};

use crate::linker::{EntityLinker, LinkOutcome, LinkResult};

// ============================================================================
// Candidates
// ============================================================================

/// All occurrences of one surface string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub ngram_type: NgramType,
    /// Sentence ordinal to locations within that sentence
    pub occurrences: BTreeMap<usize, Vec<SpanLocation>>,
}

/// Group spans by surface string, keeping first-seen order
pub fn group_candidates(spans: &[Span]) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for span in spans {
        let slot = *index.entry(span.text.as_str()).or_insert_with(|| {
            candidates.push(Candidate {
                text: span.text.clone(),
                ngram_type: span.ngram_type(),
                occurrences: BTreeMap::new(),
            });
            candidates.len() - 1
        });
        candidates[slot]
            .occurrences
            .entry(span.sentence)
            .or_default()
            .push(span.location);
    }

    candidates
}

// ============================================================================
// Report Types
// ============================================================================

/// One linked plant name as written to the report
#[derive(Debug, Clone, Serialize)]
pub struct LinkedEntity {
    pub entity_candidate: String,
    pub api_query_name: String,
    pub ngram_type: NgramType,
    pub sentences_indices: BTreeMap<usize, Vec<SpanLocation>>,
    #[serde(rename = "id_CoL")]
    pub id_col: String,
    pub taxon_rank: String,
    pub associated_scientific_name: String,
    #[serde(rename = "CoL_status")]
    pub col_status: String,
    pub biblio_reference: String,
    #[serde(rename = "url_to_CoL_entry")]
    pub url_to_col_entry: String,
}

impl LinkedEntity {
    fn new(candidate: Candidate, result: LinkResult) -> Self {
        let record = result.record;
        Self {
            entity_candidate: candidate.text,
            api_query_name: result.query_name,
            ngram_type: candidate.ngram_type,
            sentences_indices: candidate.occurrences,
            id_col: record.id,
            taxon_rank: record.rank,
            associated_scientific_name: record.scientific_name,
            col_status: record.status,
            biblio_reference: record.bibliographic_citation,
            url_to_col_entry: record.url,
        }
    }
}

/// The JSON document produced by a linking run
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkingReport {
    pub plant_names: Vec<LinkedEntity>,
}

impl LinkingReport {
    /// Write the report as JSON
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| PhytoError::Other(anyhow::anyhow!("Failed to write report: {e}")))
    }
}

/// Aggregate counters of a linking run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkingSummary {
    pub sentences: usize,
    /// One per extracted span
    pub entities_found: usize,
    /// Distinct candidates
    pub candidates: usize,
    /// Distinct candidates resolved
    pub linked: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub elapsed_secs: f64,
}

impl LinkingSummary {
    pub fn report(&self) -> String {
        format!(
            "Processed {} sentences in {:.2} sec.\n\
             {} botanical entities found ({} distinct).\n\
             {} linked, {} unresolved, {} failed.\n",
            self.sentences,
            self.elapsed_secs,
            self.entities_found,
            self.candidates,
            self.linked,
            self.unresolved,
            self.failed,
        )
    }
}

// ============================================================================
// Linking Run
// ============================================================================

impl EntityLinker {
    /// Link all spans of a corpus and build the report
    pub async fn link_spans(
        &self,
        spans: &[Span],
        sentences: usize,
    ) -> (LinkingReport, LinkingSummary) {
        let start = Instant::now();
        let candidates = group_candidates(spans);
        let names: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        let results = self.link_all(&names).await;

        let mut summary = LinkingSummary {
            sentences,
            entities_found: spans.len(),
            candidates: candidates.len(),
            ..LinkingSummary::default()
        };
        for result in &results {
            match result.outcome {
                LinkOutcome::Resolved { .. } => summary.linked += 1,
                LinkOutcome::Unresolved => summary.unresolved += 1,
                LinkOutcome::Failed(_) => summary.failed += 1,
            }
        }

        let plant_names = candidates
            .into_iter()
            .zip(results)
            .map(|(candidate, result)| LinkedEntity::new(candidate, result))
            .collect();
        summary.elapsed_secs = start.elapsed().as_secs_f64();

        info!(
            sentences = summary.sentences,
            found = summary.entities_found,
            linked = summary.linked,
            unresolved = summary.unresolved,
            failed = summary.failed,
            "Linking finished"
        );
        (LinkingReport { plant_names }, summary)
    }
}

// ============================================================================
// Tests
// ============================================================================
