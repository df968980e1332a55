//! Span extraction from tag streams
//!
//! Rebuilds entity mentions from IOB tags. Every `B-<category>` starts a
//! span that absorbs the directly following `I-<category>` tokens:
//! - `B` followed by `O`, another `B-`, or the sentence end is a unigram
//! - `B I` followed by a non-`I` tag is a bigram
//! - longer runs continue until the first tag that is not `I-<category>`
//!
//! Two adjacent `B-` tags are always two spans, even for the same
//! category. `I-` tags not reached from a `B-` are ignored.

use phyto_core::{Span, Tag};

use crate::format::{StreamItem, TagStream};

/// Spans found in a stream, plus the number of sentences scanned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedSpans {
    pub spans: Vec<Span>,
    pub sentences: usize,
}

/// Reconstructs entity spans from tagged sentences
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanExtractor;

impl SpanExtractor {
    /// Extract spans from a normalized stream
    ///
    /// Sentence ordinals start at 1 and advance at every end-of-sentence
    /// marker; tokens after the last marker form a final sentence.
    pub fn extract(&self, stream: &TagStream) -> ExtractedSpans {
        let mut result = ExtractedSpans::default();
        let mut tokens: Vec<&str> = Vec::new();
        let mut tags: Vec<Tag> = Vec::new();

        for item in &stream.items {
            match item {
                StreamItem::Token { token, tag } => {
                    tokens.push(token);
                    tags.push(tag.clone());
                }
                StreamItem::EndOfSentence => {
                    result.sentences += 1;
                    result
                        .spans
                        .extend(self.extract_sentence(&tokens, &tags, result.sentences));
                    tokens.clear();
                    tags.clear();
                }
            }
        }

        if !tokens.is_empty() {
            result.sentences += 1;
            result
                .spans
                .extend(self.extract_sentence(&tokens, &tags, result.sentences));
        }

        result
    }

    /// Extract spans from one tagged sentence
    pub fn extract_sentence<S: AsRef<str>>(
        &self,
        tokens: &[S],
        tags: &[Tag],
        sentence: usize,
    ) -> Vec<Span> {
        let len = tokens.len().min(tags.len());
        let mut spans = Vec::new();
        let mut index = 0;

        while index < len {
            let Tag::Begin(category) = &tags[index] else {
                index += 1;
                continue;
            };

            let mut end = index + 1;
            while end < len && tags[end].continues(category) {
                end += 1;
            }

            let surface: Vec<&str> = tokens[index..end].iter().map(AsRef::as_ref).collect();
            spans.push(Span::from_tokens(&surface, category.as_str(), sentence, index));
            index = end;
        }

        spans
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{read_tag_stream, TagFormat};
    use phyto_core::SpanLocation;
    use std::io::Cursor;

    fn tags(raw: &[&str]) -> Vec<Tag> {
        raw.iter().map(|t| t.parse().unwrap()).collect()
    }

    #[test]
    fn test_unigram_span() {
        let spans = SpanExtractor.extract_sentence(
            &["Angelonia", "species", "found"],
            &tags(&["B-lat_genus", "O", "O"]),
            1,
        );
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Angelonia");
        assert_eq!(spans[0].location, SpanLocation::Single(0));
        assert_eq!(spans[0].category, "lat_genus");
    }

    #[test]
    fn test_bigram_and_longer_spans() {
        let spans = SpanExtractor.extract_sentence(
            &["Bellis", "perennis", "und", "Calceolaria", "integrifolia", "var.", "x", "."],
            &tags(&[
                "B-lat_species",
                "I-lat_species",
                "O",
                "B-lat_species",
                "I-lat_species",
                "I-lat_species",
                "I-lat_species",
                "O",
            ]),
            4,
        );
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "Bellis perennis");
        assert_eq!(spans[0].location, SpanLocation::Range(0, 1));
        assert_eq!(spans[1].text, "Calceolaria integrifolia var. x");
        assert_eq!(spans[1].location, SpanLocation::Range(3, 6));
        assert_eq!(spans[1].sentence, 4);
    }

    #[test]
    fn test_adjacent_begin_tags_are_separate() {
        let spans = SpanExtractor.extract_sentence(
            &["daisy", "Asteraceae", "Bellis"],
            &tags(&["B-en_species", "B-en_fam", "B-en_fam"]),
            1,
        );
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["daisy", "Asteraceae", "Bellis"]);
        assert!(spans.iter().all(|s| matches!(s.location, SpanLocation::Single(_))));
    }

    #[test]
    fn test_span_at_sentence_end() {
        let spans = SpanExtractor.extract_sentence(
            &["Sie", "fand", "Bellis", "perennis"],
            &tags(&["O", "O", "B-lat_species", "I-lat_species"]),
            1,
        );
        assert_eq!(spans[0].location, SpanLocation::Range(2, 3));
    }

    #[test]
    fn test_stray_and_foreign_inside_tags_ignored() {
        let spans = SpanExtractor.extract_sentence(
            &["x", "Bellis", "perennis"],
            &tags(&["I-lat_species", "B-lat_genus", "I-lat_species"]),
            1,
        );
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Bellis");
        assert_eq!(spans[0].location, SpanLocation::Single(1));
    }

    #[test]
    fn test_extract_stream_offsets_restart_per_sentence() {
        let input = "Most__O Angelonia__B-lat_genus species__O\nBellis__B-lat_species perennis__I-lat_species\n";
        let stream = read_tag_stream(Cursor::new(input), TagFormat::Chunks).unwrap();
        let extracted = SpanExtractor.extract(&stream);

        assert_eq!(extracted.sentences, 2);
        assert_eq!(extracted.spans.len(), 2);
        assert_eq!(extracted.spans[0].sentence, 1);
        assert_eq!(extracted.spans[0].location, SpanLocation::Single(1));
        assert_eq!(extracted.spans[1].sentence, 2);
        assert_eq!(extracted.spans[1].location, SpanLocation::Range(0, 1));
    }

    #[test]
    fn test_malformed_row_keeps_later_offsets() {
        let input = "Die\tdie\tART\tO\n\
                     Gewöhnliche\tgewöhnlich\tADJA\tX-bad\n\
                     Bellis\tBellis\tNE\tB-lat_genus\n\
                     kaputt\n\
                     Bellis\tBellis\tNE\tB-lat_species\n\
                     perennis\tperennis\tNE\tI-lat_species\n";
        let stream = read_tag_stream(Cursor::new(input), TagFormat::Iob).unwrap();
        let extracted = SpanExtractor.extract(&stream);

        assert_eq!(stream.errors.len(), 2);
        assert_eq!(extracted.sentences, 1);
        assert_eq!(extracted.spans.len(), 2);
        assert_eq!(extracted.spans[0].location, SpanLocation::Single(2));
        assert_eq!(extracted.spans[1].text, "Bellis perennis");
        assert_eq!(extracted.spans[1].location, SpanLocation::Range(4, 5));
    }
}
