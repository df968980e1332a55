//! Phyto Annotator - Gazetteer-based plant name tagging
//!
//! Turns tokenized corpora into IOB-annotated corpora and back into
//! entity spans:
//! - Gazetteer loading and priority ordering (`gazetteer`)
//! - Per-sentence dictionary matching (`matcher`)
//! - Overlap resolution into one tag per token (`resolver`)
//! - Corpus annotation of token-row files (`annotate`)
//! - Span extraction from tagged streams (`spans`)
//! - Silver/gold evaluation and corpus statistics (`metrics`, `stats`)

pub mod annotate;
pub mod format;
pub mod gazetteer;
pub mod matcher;
pub mod metrics;
pub mod resolver;
pub mod spans;
pub mod stats;

pub use annotate::{iob_output_path, AnnotationSummary, Annotator};
pub use format::{read_tag_stream, write_sentence_lines, LineError, TagFormat, TagStream};
pub use gazetteer::{Gazetteer, GazetteerKind, GazetteerStore, Priority};
pub use matcher::{Occurrence, SentenceMatcher, SentenceMatches};
pub use metrics::{Evaluator, TagEvaluation, TagMetrics};
pub use resolver::SpanResolver;
pub use spans::{ExtractedSpans, SpanExtractor};
pub use stats::CorpusStatistics;
