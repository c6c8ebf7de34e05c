//! Property-based tests using proptest

use proptest::prelude::*;
use word_rank_grader::*;

fn word() -> impl Strategy<Value = String> {
    "[a-z]{1,12}"
}

fn dense_pair() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
    (1usize..16).prop_flat_map(|dim| {
        (
            prop::collection::vec(-10.0f32..10.0, dim),
            prop::collection::vec(-10.0f32..10.0, dim),
        )
    })
}

fn unique_words(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(word(), 1..max).prop_map(|set| set.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_sparse_similarity_is_symmetric_and_bounded(a in word(), b in word()) {
        let va = VectorRepresentation::Sparse(SparseVector::char_frequencies(&a));
        let vb = VectorRepresentation::Sparse(SparseVector::char_frequencies(&b));

        let ab = cosine_similarity(&va, &vb);
        let ba = cosine_similarity(&vb, &va);
        prop_assert_eq!(ab, ba);
        prop_assert!((0.0..=1.0).contains(&ab));
    }

    #[test]
    fn test_dense_similarity_is_symmetric_and_bounded((a, b) in dense_pair()) {
        let va = VectorRepresentation::Dense(DenseVector::new(a));
        let vb = VectorRepresentation::Dense(DenseVector::new(b));

        let ab = cosine_similarity(&va, &vb);
        let ba = cosine_similarity(&vb, &va);
        prop_assert_eq!(ab, ba);
        prop_assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn test_self_similarity_is_one(w in word()) {
        let v = VectorRepresentation::Sparse(SparseVector::char_frequencies(&w));
        prop_assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_dense_vector_has_zero_similarity(values in prop::collection::vec(-5.0f32..5.0, 1..8)) {
        let zero = VectorRepresentation::Dense(DenseVector::new(vec![0.0; values.len()]));
        let other = VectorRepresentation::Dense(DenseVector::new(values));
        prop_assert_eq!(cosine_similarity(&zero, &other), 0.0);
        prop_assert_eq!(cosine_similarity(&other, &zero), 0.0);
    }

    #[test]
    fn test_reference_ranks_are_a_permutation(words in unique_words(40), target in word()) {
        let corpus = Corpus::new(&words).unwrap();
        let space = VectorSpace::sparse();
        let ranking = ReferenceRankingGenerator::new(&space).generate(&target, &corpus).unwrap();

        let mut ranks: Vec<Rank> = ranking.iter().map(|(_, r)| r).collect();
        ranks.sort_unstable();
        prop_assert_eq!(ranks, (1..=corpus.len() as Rank).collect::<Vec<_>>());
    }

    #[test]
    fn test_reference_generation_is_deterministic(words in unique_words(40), target in word()) {
        let corpus = Corpus::new(&words).unwrap();
        let space = VectorSpace::sparse();
        let generator = ReferenceRankingGenerator::new(&space);
        prop_assert_eq!(
            generator.generate(&target, &corpus).unwrap(),
            generator.generate(&target, &corpus).unwrap()
        );
    }

    #[test]
    fn test_metrics_stay_in_range(
        words in unique_words(30),
        target in word(),
        shuffle in prop::collection::vec(any::<u32>(), 30),
        drop_first in any::<bool>(),
    ) {
        let corpus = Corpus::new(&words).unwrap();
        let space = VectorSpace::sparse();
        let reference = ReferenceRankingGenerator::new(&space).generate(&target, &corpus).unwrap();

        let mut candidate = RankingMap::new();
        for (idx, w) in words.iter().enumerate() {
            if drop_first && idx == 0 {
                continue;
            }
            let rank = (shuffle[idx] % (words.len() as u32 + 5)) as Rank;
            candidate.insert(w.clone(), rank);
        }

        let metrics = RankComparator::default().compute(&reference, &candidate, &corpus);
        prop_assert!((0.0..=1.0).contains(&metrics.exact_accuracy));
        prop_assert!((0.0..=1.0).contains(&metrics.rank_closeness));
        prop_assert!((0.0..=1.0).contains(&metrics.top_k_overlap));
        prop_assert!(metrics.avg_rank_diff >= 0.0);
        prop_assert_eq!(metrics.top_k, corpus.len().min(10));
    }

    #[test]
    fn test_reference_always_passes_against_itself(words in unique_words(30), target in word()) {
        let corpus = Corpus::new(&words).unwrap();
        let space = VectorSpace::sparse();
        let reference = ReferenceRankingGenerator::new(&space).generate(&target, &corpus).unwrap();

        let metrics = RankComparator::default().compute(&reference, &reference, &corpus);
        prop_assert!(metrics.passed);
        prop_assert_eq!(metrics.exact_accuracy, 1.0);
    }
}
