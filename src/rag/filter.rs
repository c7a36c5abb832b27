// Similarity threshold filter with a minimum-count fallback
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{info, warn};

use crate::types::passage::{score_range, ScoredPassage};

/// Outcome of a filter pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    /// Passages kept, in arrival order
    pub surviving: Vec<ScoredPassage>,
    pub original_count: usize,
    pub surviving_count: usize,
    /// True when the threshold kept too few and top-N by score was used instead
    pub fallback_triggered: bool,
    pub threshold_used: f64,
    /// (min, max) of the original scores
    pub score_range: Option<(f64, f64)>,
}

/// Drops passages scoring below a threshold, keeping at least `min_keep`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityFilter {
    threshold: f64,
    min_keep: usize,
}

impl SimilarityFilter {
    pub fn new(threshold: f64, min_keep: usize) -> Self {
        Self {
            threshold,
            min_keep,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn min_keep(&self) -> usize {
        self.min_keep
    }

    /// True when the threshold is 0.0 and every passage passes untouched
    pub fn is_disabled(&self) -> bool {
        self.threshold == 0.0
    }

    /// Apply the filter. Input must already be sorted by score descending.
    pub fn filter(&self, passages: &[ScoredPassage]) -> FilterResult {
        let original_count = passages.len();
        let range = score_range(passages);

        if passages.is_empty() {
            return FilterResult {
                surviving: Vec::new(),
                original_count: 0,
                surviving_count: 0,
                fallback_triggered: false,
                threshold_used: self.threshold,
                score_range: None,
            };
        }

        // Zero disables filtering outright; scores may be negative
        let above: Vec<usize> = if self.is_disabled() {
            (0..original_count).collect()
        } else {
            passages
                .iter()
                .enumerate()
                .filter(|(_, p)| p.score >= self.threshold)
                .map(|(idx, _)| idx)
                .collect()
        };

        let floor = self.min_keep.min(original_count);
        let fallback_triggered = above.len() < floor;

        let kept = if fallback_triggered {
            warn!(
                threshold = self.threshold,
                above_threshold = above.len(),
                min_keep = self.min_keep,
                using_top_n = floor,
                "similarity filter fallback triggered"
            );
            top_n_in_arrival_order(passages, floor)
        } else {
            above
        };

        let surviving: Vec<ScoredPassage> = kept.iter().map(|&idx| passages[idx].clone()).collect();
        let surviving_count = surviving.len();

        let (min_score, max_score) = range.unwrap_or((0.0, 0.0));
        info!(
            threshold = self.threshold,
            original = original_count,
            filtered = surviving_count,
            fallback = fallback_triggered,
            min_score,
            max_score,
            "similarity filter applied"
        );

        FilterResult {
            surviving,
            original_count,
            surviving_count,
            fallback_triggered,
            threshold_used: self.threshold,
            score_range: range,
        }
    }
}

impl Default for SimilarityFilter {
    /// Threshold 0.0 keeps every passage
    fn default() -> Self {
        Self::new(0.0, 2)
    }
}

/// Indices of the `n` best-scoring passages, ties broken by arrival, returned in arrival order
fn top_n_in_arrival_order(passages: &[ScoredPassage], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..passages.len()).collect();
    // sort_by is stable, so equal scores keep arrival order
    order.sort_by(|&a, &b| {
        passages[b]
            .score
            .partial_cmp(&passages[a].score)
            .unwrap_or(Ordering::Equal)
    });
    order.truncate(n);
    order.sort_unstable();
    order
}
