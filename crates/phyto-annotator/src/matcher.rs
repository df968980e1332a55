//! Sentence-level dictionary matching
//!
//! Finds every exact occurrence of every gazetteer entry in a tokenized
//! sentence. Matching is exact string equality on tokens; a whole-sentence
//! substring test rejects gazetteers with no possible hit before any
//! token-index work is done.

use crate::gazetteer::{Gazetteer, GazetteerKind, GazetteerStore};

/// One match of a gazetteer entry in a sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Occurrence {
    /// Single-token match at a token index
    Single(usize),
    /// Multi-token match covering `start..end` (end exclusive)
    Multi { start: usize, end: usize },
}

impl Occurrence {
    pub fn start(&self) -> usize {
        match *self {
            Self::Single(i) => i,
            Self::Multi { start, .. } => start,
        }
    }

    /// One past the last covered index
    pub fn end(&self) -> usize {
        match *self {
            Self::Single(i) => i + 1,
            Self::Multi { end, .. } => end,
        }
    }

    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi { .. })
    }
}

/// All occurrences found for one gazetteer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatches {
    pub category: String,
    pub kind: GazetteerKind,
    pub occurrences: Vec<Occurrence>,
}

/// Matches for one sentence, in gazetteer priority order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentenceMatches {
    pub categories: Vec<CategoryMatches>,
}

impl SentenceMatches {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total number of occurrences across all categories
    pub fn total(&self) -> usize {
        self.categories.iter().map(|c| c.occurrences.len()).sum()
    }

    pub fn get(&self, category: &str) -> Option<&CategoryMatches> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Finds gazetteer occurrences in tokenized sentences
#[derive(Debug, Clone, Copy)]
pub struct SentenceMatcher<'a> {
    store: &'a GazetteerStore,
}

impl<'a> SentenceMatcher<'a> {
    pub fn new(store: &'a GazetteerStore) -> Self {
        Self { store }
    }

    /// Find all occurrences of all gazetteer entries in a sentence
    ///
    /// Gazetteers without a hit are omitted from the result.
    pub fn find<S: AsRef<str>>(&self, sentence: &[S]) -> SentenceMatches {
        let tokens: Vec<&str> = sentence.iter().map(AsRef::as_ref).collect();
        let joined = tokens.join(" ");

        let categories = self
            .store
            .iter()
            .filter(|g| g.occurs_in(&joined))
            .filter_map(|g| {
                let occurrences = match g.kind() {
                    GazetteerKind::Unigram => unigram_occurrences(g, &tokens),
                    GazetteerKind::Multiword => multiword_occurrences(g, &tokens),
                };
                (!occurrences.is_empty()).then(|| CategoryMatches {
                    category: g.category().to_string(),
                    kind: g.kind(),
                    occurrences,
                })
            })
            .collect();

        SentenceMatches { categories }
    }
}

fn unigram_occurrences(gazetteer: &Gazetteer, tokens: &[&str]) -> Vec<Occurrence> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| gazetteer.contains(token))
        .map(|(i, _)| Occurrence::Single(i))
        .collect()
}

fn multiword_occurrences(gazetteer: &Gazetteer, tokens: &[&str]) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();

    for (start, token) in tokens.iter().enumerate() {
        // Single-token rows inside a multiword file match like unigrams
        if !token.contains(' ') && gazetteer.contains(token) {
            occurrences.push(Occurrence::Single(start));
        }

        for phrase in gazetteer.phrases_starting_with(token) {
            let end = start + phrase.len();
            if end > tokens.len() {
                continue;
            }
            let window = &tokens[start..end];
            if window.iter().zip(phrase).all(|(t, p)| *t == p) {
                occurrences.push(Occurrence::Multi { start, end });
            }
        }
    }

    occurrences
}

// ============================================================================
// Tests
// ============================================================================
