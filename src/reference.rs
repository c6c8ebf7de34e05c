//! Reference (ground-truth) rankings.
//!
//! References are computed once, at warm-up, and never change afterwards.
//! [`TestBattery`] owns them; graders share it behind an `Arc` for any
//! number of concurrent readers.

use crate::errors::{GraderError, Result};
use crate::types::{normalize_word, Corpus, Rank, RankingMap, TestCaseSpec};
use crate::vector::VectorSpace;
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;

/// A corpus word with its similarity to the target and its reference rank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredWord {
    pub word: String,
    pub similarity: f64,
    pub rank: Rank,
}

/// Ranks a corpus against a target word using a [`VectorSpace`].
#[derive(Debug, Clone, Copy)]
pub struct ReferenceRankingGenerator<'a> {
    space: &'a VectorSpace,
}

impl<'a> ReferenceRankingGenerator<'a> {
    /// Create a generator over `space`
    pub fn new(space: &'a VectorSpace) -> Self {
        Self { space }
    }

    /// Corpus words sorted by descending similarity to `target`.
    ///
    /// The sort is stable: words with equal similarity keep their corpus
    /// order. Ranks are 1-based positions in the sorted sequence.
    pub fn score(&self, target: &str, corpus: &Corpus) -> Result<Vec<ScoredWord>> {
        let target = normalize_word(target);
        if target.is_empty() {
            return Err(GraderError::empty_input("target word is blank"));
        }

        let target_vec = self.space.compute_embedding(&target)?;

        let mut scored = corpus
            .iter()
            .map(|word| {
                let vec = self.space.compute_embedding(word)?;
                Ok((word, self.space.cosine_similarity(&target_vec, &vec)))
            })
            .collect::<Result<Vec<(&str, f64)>>>()?;

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(idx, (word, similarity))| ScoredWord {
                word: word.to_string(),
                similarity,
                rank: idx as Rank + 1,
            })
            .collect())
    }

    /// The reference ranking of `corpus` for `target`.
    ///
    /// Ranks form exactly `{1, ..., N}` for a corpus of `N` words.
    pub fn generate(&self, target: &str, corpus: &Corpus) -> Result<RankingMap> {
        let scored = self.score(target, corpus)?;
        let mut ranking = RankingMap::with_capacity(scored.len());
        for entry in scored {
            ranking.insert(entry.word, entry.rank);
        }
        Ok(ranking)
    }
}

// ============================================================================
// Test cases
// ============================================================================

/// An immutable test case with its cached reference ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    target: String,
    description: String,
    reference: RankingMap,
}

impl TestCase {
    /// Assemble a test case from a precomputed reference.
    pub fn new(
        target: impl Into<String>,
        description: impl Into<String>,
        reference: RankingMap,
    ) -> Self {
        Self {
            target: normalize_word(&target.into()),
            description: description.into(),
            reference,
        }
    }

    /// Normalized target word
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The ground-truth ranking
    pub fn reference(&self) -> &RankingMap {
        &self.reference
    }
}

/// The fixed battery of test cases over one corpus.
#[derive(Debug, Clone)]
pub struct TestBattery {
    corpus: Corpus,
    cases: Vec<TestCase>,
}

impl TestBattery {
    /// Compute every reference ranking.
    ///
    /// Cases are generated in parallel; the resulting order always matches
    /// `specs`.
    pub fn build(space: &VectorSpace, corpus: Corpus, specs: &[TestCaseSpec]) -> Result<Self> {
        if specs.is_empty() {
            return Err(GraderError::empty_input("test battery has no cases"));
        }

        let generator = ReferenceRankingGenerator::new(space);
        let cases = specs
            .par_iter()
            .map(|spec| {
                let reference = generator.generate(&spec.target, &corpus)?;
                Ok(TestCase::new(&spec.target, &spec.description, reference))
            })
            .collect::<Result<Vec<TestCase>>>()?;

        Ok(Self { corpus, cases })
    }

    /// The shared corpus
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Test cases in battery order
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Number of test cases
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether the battery is empty (never true once built)
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
