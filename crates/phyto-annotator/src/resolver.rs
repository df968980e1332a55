//! IOB tag resolution
//!
//! Merges the occurrences found for a sentence into exactly one tag per
//! token. Occurrences are applied in a fixed precedence order and each
//! token can be claimed once; the first occurrence to claim a token wins.
//!
//! Precedence, highest first:
//! 1. gazetteer priority (see [`crate::gazetteer::Priority`])
//! 2. within a gazetteer, multi-token before single-token matches
//! 3. leftmost start index
//! 4. longer span
//!
//! Multi-token occurrences are all-or-nothing: one that overlaps an
//! already claimed token is dropped entirely, so an `I-` tag is always
//! preceded by the `B-`/`I-` of its own span.

use std::cmp::Reverse;

use phyto_core::{PhytoError, Result, Tag};

use crate::matcher::{Occurrence, SentenceMatches};

/// Tagging state while walking a sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State<'a> {
    Outside,
    Inside { category: &'a str, end: usize },
}

/// Resolves sentence matches into an IOB tag sequence
///
/// Holds the claimed-token buffer so it can be reused across sentences.
#[derive(Debug, Default)]
pub struct SpanResolver {
    claimed: Vec<bool>,
}

impl SpanResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce one tag per token for a sentence of `token_count` tokens
    pub fn resolve(&mut self, token_count: usize, matches: &SentenceMatches) -> Result<Vec<Tag>> {
        self.claimed.clear();
        self.claimed.resize(token_count, false);

        let mut ordered: Vec<(usize, &Occurrence)> = matches
            .categories
            .iter()
            .enumerate()
            .flat_map(|(rank, cm)| cm.occurrences.iter().map(move |occ| (rank, occ)))
            .collect();
        ordered.sort_by_key(|(rank, occ)| {
            (*rank, !occ.is_multi(), occ.start(), Reverse(occ.len()))
        });

        // Span beginning at each index: (category rank, exclusive end)
        let mut starts: Vec<Option<(usize, usize)>> = vec![None; token_count];
        for (rank, occ) in ordered {
            let (start, end) = (occ.start(), occ.end());
            if start >= end || end > token_count {
                return Err(PhytoError::InconsistentState(format!(
                    "occurrence {start}..{end} outside sentence of {token_count} tokens"
                )));
            }
            if self.claimed[start..end].iter().any(|&c| c) {
                continue;
            }
            self.claimed[start..end].fill(true);
            starts[start] = Some((rank, end));
        }

        let mut tags = Vec::with_capacity(token_count);
        let mut state = State::Outside;
        for (index, begins) in starts.iter().enumerate() {
            match state {
                State::Inside { category, end } if index < end => {
                    tags.push(Tag::inside(category));
                    if index == end - 1 {
                        state = State::Outside;
                    }
                }
                _ => match *begins {
                    Some((rank, end)) => {
                        let category = matches.categories[rank].category.as_str();
                        tags.push(Tag::begin(category));
                        state = if end > index + 1 {
                            State::Inside { category, end }
                        } else {
                            State::Outside
                        };
                    }
                    None => tags.push(Tag::Outside),
                },
            }
        }

        if let State::Inside { category, end } = state {
            return Err(PhytoError::InconsistentState(format!(
                "span of {category} ending at {end} left open at sentence end"
            )));
        }

        Ok(tags)
    }
}

// ============================================================================
// Tests
// ============================================================================
