//! Candidate-versus-reference ranking metrics and the pass policy.
//!
//! Three independent heuristics are computed over the corpus:
//!
//! | Metric | Definition |
//! |--------|------------|
//! | `exact_accuracy` | fraction of words whose candidate rank equals the reference rank |
//! | `rank_closeness` | `max(0, 1 - avg_rank_diff / span)` |
//! | `top_k_overlap` | shared words between both top-K sets, divided by K |
//!
//! A case passes when any one of them clears its threshold.

use crate::types::{Corpus, GradingPolicy, Rank, RankingMap};
use serde::{Deserialize, Serialize};

/// Effective rank of a corpus word the candidate did not rank.
///
/// Large enough that a single missing word dominates the average rank
/// difference for any realistic corpus.
pub const MISSING_RANK_PENALTY: Rank = 999;

/// Metrics for one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Fraction of corpus words ranked exactly right, in `[0, 1]`
    pub exact_accuracy: f64,
    /// Mean absolute rank displacement (missing words count as
    /// [`MISSING_RANK_PENALTY`])
    pub avg_rank_diff: f64,
    /// Linear closeness score, in `[0, 1]`
    pub rank_closeness: f64,
    /// Top-K overlap ratio, in `[0, 1]`
    pub top_k_overlap: f64,
    /// The K actually used (`min(policy.top_k, corpus size)`)
    pub top_k: usize,
    /// Pass flag derived from the policy
    pub passed: bool,
}

/// Compares candidate rankings with reference rankings.
#[derive(Debug, Clone, Default)]
pub struct RankComparator {
    policy: GradingPolicy,
}

impl RankComparator {
    /// Create a comparator with the given policy
    pub fn new(policy: GradingPolicy) -> Self {
        Self { policy }
    }

    /// The pass policy in use
    pub fn policy(&self) -> &GradingPolicy {
        &self.policy
    }

    /// Compute every metric over `corpus`.
    ///
    /// Keys of `candidate` outside the corpus are ignored by the per-word
    /// metrics but still take part in the candidate's top-K set.
    pub fn compute(&self, reference: &RankingMap, candidate: &RankingMap, corpus: &Corpus) -> Metrics {
        let n = corpus.len();
        if n == 0 {
            return Metrics {
                exact_accuracy: 0.0,
                avg_rank_diff: 0.0,
                rank_closeness: 0.0,
                top_k_overlap: 0.0,
                top_k: 0,
                passed: false,
            };
        }

        let mut exact = 0usize;
        let mut total_diff = 0f64;
        for word in corpus.iter() {
            let expected = reference.get(word).unwrap_or(MISSING_RANK_PENALTY);
            let actual = candidate.get(word).unwrap_or(MISSING_RANK_PENALTY);
            if candidate.get(word) == reference.get(word) {
                exact += 1;
            }
            total_diff += actual.abs_diff(expected) as f64;
        }

        let exact_accuracy = exact as f64 / n as f64;
        let avg_rank_diff = total_diff / n as f64;
        let rank_closeness = (1.0 - avg_rank_diff / self.policy.closeness_decay_span).max(0.0);

        let k = self.policy.top_k.min(n);
        let expected_top = reference.top_k_words(k);
        let shared = candidate
            .top_k_words(k)
            .iter()
            .filter(|w| expected_top.contains(*w))
            .count();
        let top_k_overlap = shared as f64 / k as f64;

        let passed = exact_accuracy > self.policy.exact_accuracy_threshold
            || rank_closeness > self.policy.rank_closeness_threshold
            || top_k_overlap >= self.policy.top_k_overlap_threshold;

        Metrics {
            exact_accuracy,
            avg_rank_diff,
            rank_closeness,
            top_k_overlap,
            top_k: k,
            passed,
        }
    }
}
