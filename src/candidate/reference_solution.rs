//! The canonical correct submission, run in-process.

use super::context::ExecutionContext;
use super::traits::{CandidateFault, CandidateOutput, CandidateStrategy, CapabilitySet};
use crate::types::{Rank, RankingMap};
use std::cmp::Ordering;

/// Ranks words by cosine similarity to the target using only the
/// capabilities of the [`ExecutionContext`].
///
/// Scores every word against the target's embedding (computed once), sorts
/// stably by descending similarity and numbers the result from 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceSolution;

impl CandidateStrategy for ReferenceSolution {
    fn capabilities(
        &mut self,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<CapabilitySet, CandidateFault> {
        Ok(CapabilitySet::all())
    }

    fn rank_words_by_similarity(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        target: &str,
        words: Vec<String>,
    ) -> Result<CandidateOutput, CandidateFault> {
        let target_vec = ctx.compute_embedding(target)?;

        let mut scored = Vec::with_capacity(words.len());
        for word in words {
            let vector = ctx.compute_embedding(&word)?;
            let similarity = ctx.cosine_similarity(&target_vec, &vector)?;
            scored.push((word, similarity));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let ranking = RankingMap::from_pairs(
            scored
                .into_iter()
                .enumerate()
                .map(|(idx, (word, _))| (word, idx as Rank + 1)),
        );
        Ok(ranking.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::context::Console;
    use crate::reference::ReferenceRankingGenerator;
    use crate::types::Corpus;
    use crate::vector::VectorSpace;

    #[test]
    fn test_matches_reference_generator() {
        let space = VectorSpace::sparse();
        let corpus = Corpus::builtin();
        let expected = ReferenceRankingGenerator::new(&space)
            .generate("pizza", &corpus)
            .unwrap();

        let mut console = Console::new(1024);
        let mut ctx = ExecutionContext::new(&space, &mut console);
        let output = ReferenceSolution
            .rank_words_by_similarity(&mut ctx, "pizza", corpus.to_vec())
            .unwrap();

        assert_eq!(output, CandidateOutput::Ranking(expected));
        assert_eq!(ctx.embedding_calls(), corpus.len() + 1);
    }
}
