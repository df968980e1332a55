//! Quality Metrics module
//!
//! Token-level evaluation of an automatically tagged (silver) corpus
//! against a manually corrected (gold) one. Both files are columnar IOB
//! and are compared row by row.

use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;

use serde::{Deserialize, Serialize};

use phyto_core::{PhytoError, Result};

use crate::format::io_error;

// ============================================================================
// Tag Metrics
// ============================================================================

/// Confusion counts for IOB tag evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMetrics {
    /// Both tags `O`
    pub true_negatives: usize,
    /// Identical non-`O` tags
    pub true_positives: usize,
    /// Gold non-`O`, silver `O`
    pub false_negatives: usize,
    /// Silver non-`O`, gold `O`
    pub spurious: usize,
    /// Both non-`O` but different
    pub mislabeled: usize,
    /// True positives per tag
    pub matches_per_tag: BTreeMap<String, usize>,
    /// Rows compared
    pub tokens: usize,
}

impl TagMetrics {
    /// Count one aligned pair of tags
    pub fn record(&mut self, silver: &str, gold: &str) {
        self.tokens += 1;
        match (silver == "O", gold == "O") {
            (true, true) => self.true_negatives += 1,
            (true, false) => self.false_negatives += 1,
            (false, true) => self.spurious += 1,
            (false, false) if silver == gold => {
                self.true_positives += 1;
                *self.matches_per_tag.entry(silver.to_string()).or_default() += 1;
            }
            (false, false) => self.mislabeled += 1,
        }
    }

    fn false_positives(&self) -> usize {
        self.spurious + self.mislabeled
    }

    /// (TP + TN) / all
    pub fn accuracy(&self) -> f32 {
        let total = self.true_positives
            + self.true_negatives
            + self.false_positives()
            + self.false_negatives;
        ratio(self.true_positives + self.true_negatives, total)
    }

    /// TP / (TP + FP)
    pub fn precision(&self) -> f32 {
        ratio(self.true_positives, self.true_positives + self.false_positives())
    }

    /// TP / (TP + FN)
    pub fn recall(&self) -> f32 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// 2TP / (2TP + FP + FN)
    pub fn f1_score(&self) -> f32 {
        ratio(
            2 * self.true_positives,
            2 * self.true_positives + self.false_positives() + self.false_negatives,
        )
    }
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Result of comparing a silver corpus with its gold standard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagEvaluation {
    pub metrics: TagMetrics,
    /// Every distinct tag seen in either file
    pub tag_classes: BTreeSet<String>,
}

impl TagEvaluation {
    /// Print a summary report
    pub fn report(&self) -> String {
        let m = &self.metrics;
        let classes: Vec<&str> = self.tag_classes.iter().map(String::as_str).collect();
        format!(
            "=== Silver vs. Gold Evaluation ===\n\n\
             Rows compared: {}\n\
             Accuracy:  {:.2}%\n\
             Precision: {:.2}%\n\
             Recall:    {:.2}%\n\
             F1 Score:  {:.2}%\n\
             TP: {} | TN: {} | FN: {} | FP (tag->O): {} | FP (tag->tag): {}\n\n\
             Tag classes ({}): {}\n",
            m.tokens,
            m.accuracy() * 100.0,
            m.precision() * 100.0,
            m.recall() * 100.0,
            m.f1_score() * 100.0,
            m.true_positives,
            m.true_negatives,
            m.false_negatives,
            m.spurious,
            m.mislabeled,
            classes.len(),
            classes.join(", "),
        )
    }
}

/// Row-aligned IOB evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Compare two columnar IOB streams row by row
    ///
    /// Row pairs where either side does not have four fields (sentence
    /// boundaries included) are skipped. An empty tag is a format error.
    pub fn evaluate<S: BufRead, G: BufRead>(&self, silver: S, gold: G) -> Result<TagEvaluation> {
        let mut evaluation = TagEvaluation::default();

        for (idx, (silver_line, gold_line)) in silver.lines().zip(gold.lines()).enumerate() {
            let silver_line = silver_line.map_err(|e| io_error("silver input", e))?;
            let gold_line = gold_line.map_err(|e| io_error("gold input", e))?;

            let (Some(silver_tag), Some(gold_tag)) =
                (iob_column(&silver_line), iob_column(&gold_line))
            else {
                continue;
            };

            if silver_tag.is_empty() || gold_tag.is_empty() {
                return Err(PhytoError::Format {
                    line: idx + 1,
                    message: "empty IOB tag".to_string(),
                });
            }

            evaluation.tag_classes.insert(silver_tag.to_string());
            evaluation.tag_classes.insert(gold_tag.to_string());
            evaluation.metrics.record(silver_tag, gold_tag);
        }

        Ok(evaluation)
    }
}

/// Fourth column of a `token\tlemma\tpos\tIOB` row
fn iob_column(line: &str) -> Option<&str> {
    match line.split('\t').collect::<Vec<_>>().as_slice() {
        [_, _, _, iob] => Some(*iob),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_record_categories() {
        let mut metrics = TagMetrics::default();
        metrics.record("O", "O");
        metrics.record("B-lat_genus", "B-lat_genus");
        metrics.record("O", "B-de_species");
        metrics.record("B-de_fam", "O");
        metrics.record("B-lat_genus", "B-lat_species");

        assert_eq!(metrics.true_negatives, 1);
        assert_eq!(metrics.true_positives, 1);
        assert_eq!(metrics.false_negatives, 1);
        assert_eq!(metrics.spurious, 1);
        assert_eq!(metrics.mislabeled, 1);
        assert_eq!(metrics.matches_per_tag.get("B-lat_genus"), Some(&1));
        assert_eq!(metrics.tokens, 5);
    }

    #[test]
    fn test_scores() {
        let metrics = TagMetrics {
            true_negatives: 10,
            true_positives: 8,
            false_negatives: 2,
            spurious: 1,
            mislabeled: 1,
            ..TagMetrics::default()
        };

        assert!((metrics.precision() - 0.8).abs() < 0.001);
        assert!((metrics.recall() - 0.8).abs() < 0.001);
        assert!((metrics.f1_score() - 0.8).abs() < 0.001);
        assert!((metrics.accuracy() - 18.0 / 22.0).abs() < 0.001);
    }

    #[test]
    fn test_empty_metrics_are_zero() {
        let metrics = TagMetrics::default();
        assert_eq!(metrics.precision(), 0.0);
        assert_eq!(metrics.recall(), 0.0);
        assert_eq!(metrics.f1_score(), 0.0);
        assert_eq!(metrics.accuracy(), 0.0);
    }

    #[test]
    fn test_evaluate_streams() {
        let silver = "Die\tdie\tART\tO\nBellis\tBellis\tNE\tB-lat_genus\n\nblüht\tblühen\tVVFIN\tB-de_fam\n";
        let gold = "Die\tdie\tART\tO\nBellis\tBellis\tNE\tB-lat_genus\n\nblüht\tblühen\tVVFIN\tO\n";

        let evaluation = Evaluator::new()
            .evaluate(Cursor::new(silver), Cursor::new(gold))
            .unwrap();

        assert_eq!(evaluation.metrics.tokens, 3);
        assert_eq!(evaluation.metrics.true_positives, 1);
        assert_eq!(evaluation.metrics.spurious, 1);
        assert_eq!(evaluation.tag_classes.len(), 3);
        assert!(evaluation.report().contains("Rows compared: 3"));
    }

    #[test]
    fn test_empty_tag_is_error() {
        let silver = "Die\tdie\tART\t\n";
        let gold = "Die\tdie\tART\tO\n";

        let err = Evaluator::new()
            .evaluate(Cursor::new(silver), Cursor::new(gold))
            .unwrap_err();
        assert!(matches!(err, PhytoError::Format { line: 1, .. }));
    }
}
