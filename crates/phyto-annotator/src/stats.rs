//! Corpus statistics for IOB-annotated resources

use std::collections::{BTreeMap, HashSet};
use std::io::BufRead;

use serde::Serialize;

use phyto_core::Result;

use crate::format::{io_error, LineError, TaggedRow};

/// Size and label statistics of one columnar IOB corpus
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorpusStatistics {
    pub sentences: usize,
    pub tokens: usize,
    /// Distinct token strings
    pub types: usize,
    pub mean_sentence_length: f32,
    /// Mean token length in characters
    pub mean_token_length: f32,
    /// Tagged tokens per category (`B-` and `I-` both counted)
    pub tags_per_category: BTreeMap<String, usize>,
    /// Distinct tagged token strings per category
    pub distinct_per_category: BTreeMap<String, usize>,
    /// Distinct (category, token) pairs
    pub unique_tagged: usize,
    pub errors: Vec<LineError>,
}

impl CorpusStatistics {
    /// Collect statistics from an IOB stream
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut stats = Self::default();
        let mut types: HashSet<String> = HashSet::new();
        let mut tagged: HashSet<(String, String)> = HashSet::new();
        let mut sentence_lengths: Vec<usize> = Vec::new();
        let mut current = 0usize;
        let mut token_chars = 0usize;

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| io_error("statistics input", e))?;
            if line.is_empty() {
                if current > 0 {
                    sentence_lengths.push(current);
                    current = 0;
                }
                continue;
            }

            let row = match TaggedRow::parse(&line, idx + 1) {
                Ok(row) => row,
                Err(e) => {
                    stats.errors.push(e);
                    continue;
                }
            };

            current += 1;
            stats.tokens += 1;
            token_chars += row.token.chars().count();
            if let Some(category) = row.tag.category() {
                *stats.tags_per_category.entry(category.to_string()).or_default() += 1;
                tagged.insert((category.to_string(), row.token.clone()));
            }
            types.insert(row.token);
        }
        if current > 0 {
            sentence_lengths.push(current);
        }

        stats.sentences = sentence_lengths.len();
        stats.types = types.len();
        stats.unique_tagged = tagged.len();
        if stats.sentences > 0 {
            stats.mean_sentence_length = stats.tokens as f32 / stats.sentences as f32;
        }
        if stats.tokens > 0 {
            stats.mean_token_length = token_chars as f32 / stats.tokens as f32;
        }
        for (category, _) in &tagged {
            *stats.distinct_per_category.entry(category.clone()).or_default() += 1;
        }

        Ok(stats)
    }

    /// Tagged tokens over all categories
    pub fn total_tags(&self) -> usize {
        self.tags_per_category.values().sum()
    }

    /// Share of distinct (category, token) pairs among all tagged tokens
    pub fn unique_ratio(&self) -> f32 {
        match self.total_tags() {
            0 => 0.0,
            total => self.unique_tagged as f32 / total as f32,
        }
    }

    pub fn report(&self) -> String {
        let per_category = |map: &BTreeMap<String, usize>| {
            map.iter()
                .map(|(c, n)| format!("{c}: {n}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Sentences: {}\n\
             Tokens (incl. punctuation): {}\n\
             Mean sentence length: {:.2}\n\
             Mean token length: {:.2}\n\
             Unique types: {}\n\
             Tag occurrences: {}\n\
             Tags total: {} | unique: {} ({:.2}%)\n\
             Distinct names per category: {}\n",
            self.sentences,
            self.tokens,
            self.mean_sentence_length,
            self.mean_token_length,
            self.types,
            per_category(&self.tags_per_category),
            self.total_tags(),
            self.unique_tagged,
            self.unique_ratio() * 100.0,
            per_category(&self.distinct_per_category),
        )
    }
}
