//! Phyto Linker - Taxonomic entity linking
//!
//! Resolves extracted plant-name candidates to Catalogue of Life records:
//! - Name service abstraction and HTTP client (`client`)
//! - Vernacular to scientific lookup fallback (`lookup`)
//! - Per-candidate linking with bounded concurrency (`linker`)
//! - `plant_names` JSON report and run counters (`report`)
//!
//! Author: hephaex@gmail.com

pub mod client;
pub mod linker;
pub mod lookup;
pub mod report;

#[cfg(test)]
mod testing;

pub use client::{ColClient, ColResult, SearchResponse, TaxonomyService, DEFAULT_BASE_URL};
pub use linker::{EntityLinker, LinkOutcome, LinkResult, TaxonRecord, TaxonStatus};
pub use lookup::LookupTable;
pub use report::{group_candidates, Candidate, LinkedEntity, LinkingReport, LinkingSummary};
