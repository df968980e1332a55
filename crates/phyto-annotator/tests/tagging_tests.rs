//! Tagging Integration Tests
//!
//! End-to-end checks of gazetteer loading, tagging and span extraction,
//! plus property tests over randomly generated sentences.

use std::io::Cursor;

use phyto_annotator::format::{chunk_line, read_tag_stream, TagFormat};
use phyto_annotator::{
    Annotator, Gazetteer, GazetteerStore, Priority, SentenceMatcher, SpanExtractor,
};
use phyto_core::{NgramType, SpanLengthRule, SpanLocation, Tag};
use proptest::prelude::*;

const VOCABULARY: &[&str] = &[
    "Bellis",
    "perennis",
    "Viola",
    "odorata",
    "Calceolaria",
    "integrifolia",
    "Angelonia",
    "Rosaceae",
    "und",
    "die",
    ".",
];

fn gazetteers() -> Vec<Gazetteer> {
    let rule = SpanLengthRule::Tokens;
    vec![
        Gazetteer::new("lat_genus", ["Bellis", "Viola", "Angelonia"], rule).unwrap(),
        Gazetteer::new(
            "lat_species",
            ["Bellis perennis", "Viola odorata", "Calceolaria integrifolia"],
            rule,
        )
        .unwrap(),
        Gazetteer::new("lat_fam", ["Rosaceae"], rule).unwrap(),
        Gazetteer::new(
            "de_species",
            ["perennis", "die Bellis perennis", "und Viola", "odorata"],
            rule,
        )
        .unwrap(),
    ]
}

fn render(tags: &[Tag]) -> Vec<String> {
    tags.iter().map(Tag::to_string).collect()
}

/// Occurrences that survive the claim filter, as (category, first, last)
/// sorted by position. Precedence: gazetteer order, multi-token before
/// single-token, leftmost, longest.
fn accepted_occurrences(
    store: &GazetteerStore,
    sentence: &[&str],
) -> Vec<(String, usize, usize)> {
    let matches = SentenceMatcher::new(store).find(sentence);
    let mut claimed = vec![false; sentence.len()];
    let mut accepted = Vec::new();

    for category in &matches.categories {
        let mut occurrences = category.occurrences.clone();
        occurrences.sort_by_key(|o| (!o.is_multi(), o.start(), std::cmp::Reverse(o.len())));
        for occurrence in occurrences {
            let range = occurrence.start()..occurrence.end();
            if claimed[range.clone()].iter().any(|&c| c) {
                continue;
            }
            claimed[range].fill(true);
            accepted.push((category.category.clone(), occurrence.start(), occurrence.end() - 1));
        }
    }

    accepted.sort_by_key(|(_, start, _)| *start);
    accepted
}

fn sentence_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(VOCABULARY), 0..24)
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[test]
fn test_genus_in_running_text() {
    let store = GazetteerStore::new(vec![
        Gazetteer::new("lat_genus", ["Angelonia"], SpanLengthRule::Tokens).unwrap(),
    ])
    .unwrap();
    let sentence = ["Most", "Angelonia", "species", "are", "found", "in", "Brazil", "."];

    let tags = Annotator::new(&store).tag(&sentence).unwrap();
    assert_eq!(
        render(&tags),
        vec!["O", "B-lat_genus", "O", "O", "O", "O", "O", "O"]
    );

    let spans = SpanExtractor.extract_sentence(&sentence, &tags, 1);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].text, "Angelonia");
    assert_eq!(spans[0].location, SpanLocation::Single(1));
    assert_eq!(spans[0].ngram_type(), NgramType::Unigram);
}

#[test]
fn test_hyphenated_name_is_one_token() {
    let store = GazetteerStore::new(vec![Gazetteer::new(
        "de_species",
        ["Zwerg-Gänsekresse", "Gewöhnliches Gänseblümchen"],
        SpanLengthRule::Tokens,
    )
    .unwrap()])
    .unwrap();

    let tags = Annotator::new(&store)
        .tag(&["Die", "Zwerg-Gänsekresse", "blüht"])
        .unwrap();
    assert_eq!(render(&tags), vec!["O", "B-de_species", "O"]);
}

#[test]
fn test_directory_pipeline() {
    let gazetteer_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        gazetteer_dir.path().join("lat_species.txt"),
        "Calceolaria integrifolia\nBellis perennis\n",
    )
    .unwrap();
    std::fs::write(gazetteer_dir.path().join("de_species.txt"), "Purpurglöckchen\n").unwrap();
    let store = GazetteerStore::load(gazetteer_dir.path()).unwrap();

    let corpus = "Das\tdas\tART\nPurpurglöckchen\tPurpurglöckchen\tNN\n\n\
                  Calceolaria\tCalceolaria\tNE\nintegrifolia\tintegrifolia\tNE\nblüht\tblühen\tVVFIN\n";
    let mut annotated = Vec::new();
    let summary = Annotator::new(&store)
        .annotate_corpus(Cursor::new(corpus), &mut annotated)
        .unwrap();
    assert_eq!(summary.sentences, 2);
    assert_eq!(summary.entities, 2);

    let stream = read_tag_stream(Cursor::new(annotated), TagFormat::Iob).unwrap();
    let extracted = SpanExtractor.extract(&stream);
    assert_eq!(extracted.sentences, 2);

    let found: Vec<(&str, usize, SpanLocation)> = extracted
        .spans
        .iter()
        .map(|s| (s.text.as_str(), s.sentence, s.location))
        .collect();
    assert_eq!(
        found,
        vec![
            ("Purpurglöckchen", 1, SpanLocation::Single(1)),
            ("Calceolaria integrifolia", 2, SpanLocation::Range(0, 1)),
        ]
    );
}

#[test]
fn test_pinned_priority_overrides_size() {
    let priority = Priority::new(["de_species"]);
    let store = GazetteerStore::with_priority(gazetteers(), &priority).unwrap();

    let tags = Annotator::new(&store)
        .tag(&["die", "Bellis", "perennis"])
        .unwrap();
    assert_eq!(
        render(&tags),
        vec!["B-de_species", "I-de_species", "I-de_species"]
    );
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn one_tag_per_token(sentence in sentence_strategy()) {
        let store = GazetteerStore::new(gazetteers()).unwrap();
        let tags = Annotator::new(&store).tag(&sentence).unwrap();
        prop_assert_eq!(tags.len(), sentence.len());
    }

    #[test]
    fn inside_tags_continue_their_category(sentence in sentence_strategy()) {
        let store = GazetteerStore::new(gazetteers()).unwrap();
        let tags = Annotator::new(&store).tag(&sentence).unwrap();

        for (i, tag) in tags.iter().enumerate() {
            if let Tag::Inside(category) = tag {
                prop_assert!(i > 0);
                prop_assert_eq!(tags[i - 1].category(), Some(category.as_str()));
            }
        }
    }

    #[test]
    fn extracted_spans_are_gazetteer_entries(sentence in sentence_strategy()) {
        let store = GazetteerStore::new(gazetteers()).unwrap();
        let tags = Annotator::new(&store).tag(&sentence).unwrap();
        let spans = SpanExtractor.extract_sentence(&sentence, &tags, 1);

        let begins = tags.iter().filter(|t| t.is_begin()).count();
        prop_assert_eq!(spans.len(), begins);
        for span in &spans {
            let gazetteer = store.get(&span.category).unwrap();
            prop_assert!(gazetteer.contains(&span.text), "{} not in {}", span.text, span.category);
            prop_assert_eq!(span.location.token_count(), span.text.split(' ').count());
        }
    }

    #[test]
    fn extracted_spans_equal_accepted_occurrences(sentence in sentence_strategy()) {
        let store = GazetteerStore::new(gazetteers()).unwrap();
        let tags = Annotator::new(&store).tag(&sentence).unwrap();

        let extracted: Vec<(String, usize, usize)> = SpanExtractor
            .extract_sentence(&sentence, &tags, 1)
            .into_iter()
            .map(|span| {
                let (first, last) = match span.location {
                    SpanLocation::Single(i) => (i, i),
                    SpanLocation::Range(start, end) => (start, end),
                };
                (span.category, first, last)
            })
            .collect();

        prop_assert_eq!(extracted, accepted_occurrences(&store, &sentence));
    }

    #[test]
    fn tagging_ignores_gazetteer_input_order(sentence in sentence_strategy()) {
        let forward = GazetteerStore::new(gazetteers()).unwrap();
        let mut reversed_input = gazetteers();
        reversed_input.reverse();
        let reversed = GazetteerStore::new(reversed_input).unwrap();

        let a = Annotator::new(&forward).tag(&sentence).unwrap();
        let b = Annotator::new(&reversed).tag(&sentence).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn chunk_stream_preserves_spans(sentence in sentence_strategy()) {
        prop_assume!(!sentence.is_empty());
        let store = GazetteerStore::new(gazetteers()).unwrap();
        let tags = Annotator::new(&store).tag(&sentence).unwrap();

        let line = format!("{}\n", chunk_line(&sentence, &tags));
        let stream = read_tag_stream(Cursor::new(line), TagFormat::Chunks).unwrap();
        let extracted = SpanExtractor.extract(&stream);

        prop_assert_eq!(extracted.sentences, 1);
        prop_assert_eq!(extracted.spans, SpanExtractor.extract_sentence(&sentence, &tags, 1));
    }
}
