//! The vector space shared by reference generation and candidate execution.
//!
//! The embedding mode is decided once, when the space is built: dense if a
//! provider is available, otherwise the sparse character-frequency fallback
//! for the rest of the process lifetime. It is never re-evaluated per
//! request.

use crate::errors::{GraderError, Result};
use crate::types::{normalize_word, GraderConfig};
use crate::vector::provider::{EmbeddingProvider, WordVectorTable};
use crate::vector::representation::{SparseVector, VectorKind, VectorRepresentation};
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Produces word vectors and compares them.
///
/// Immutable after construction, cheap to clone, and safe to share across
/// threads.
#[derive(Debug, Clone)]
pub struct VectorSpace {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    fallback_reason: Option<String>,
}

impl VectorSpace {
    /// A space that only uses character-frequency vectors.
    pub fn sparse() -> Self {
        Self {
            provider: None,
            fallback_reason: None,
        }
    }

    /// A space backed by a dense embedding provider.
    pub fn dense(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider: Some(provider),
            fallback_reason: None,
        }
    }

    /// Build the space described by `config`.
    ///
    /// A configured word-vector table that cannot be loaded, or that lacks a
    /// corpus word or test target, does not fail start-up; the space falls
    /// back to sparse vectors and remembers why.
    pub fn from_config(config: &GraderConfig) -> Self {
        let Some(path) = &config.embeddings_path else {
            trace_event!(
                info,
                "no embedding table configured, using character-frequency vectors"
            );
            return Self {
                provider: None,
                fallback_reason: Some("no embedding table configured".to_string()),
            };
        };

        match WordVectorTable::load(path) {
            Ok(table) => {
                let missing = uncovered_words(&table, config);
                if let Some(first) = missing.first() {
                    let reason = format!(
                        "embedding table '{}' has no vector for '{}' ({} word(s) missing)",
                        table.name(),
                        first,
                        missing.len()
                    );
                    trace_event!(
                        warn,
                        missing = missing.len(),
                        reason = %reason,
                        "dense embedding provider incomplete, falling back to character-frequency vectors"
                    );
                    return Self {
                        provider: None,
                        fallback_reason: Some(reason),
                    };
                }
                trace_event!(
                    info,
                    provider = table.name(),
                    words = table.len(),
                    dimension = table.dimension(),
                    "dense embedding provider loaded"
                );
                Self::dense(Arc::new(table))
            }
            Err(err) => {
                trace_event!(
                    warn,
                    error = %err,
                    "dense embedding provider unavailable, falling back to character-frequency vectors"
                );
                Self {
                    provider: None,
                    fallback_reason: Some(err.to_string()),
                }
            }
        }
    }

    /// Which representation `compute_embedding` produces
    pub fn mode(&self) -> VectorKind {
        if self.provider.is_some() {
            VectorKind::Dense
        } else {
            VectorKind::Sparse
        }
    }

    /// Whether a dense provider is in use
    pub fn is_dense(&self) -> bool {
        self.provider.is_some()
    }

    /// Name of the dense provider, if any
    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    /// Why the space is running in sparse mode, if a dense provider was
    /// expected or failed to load
    pub fn fallback_reason(&self) -> Option<&str> {
        self.fallback_reason.as_deref()
    }

    /// Fail with [`GraderError::ProviderUnavailable`] unless a dense
    /// provider is in use.
    pub fn ensure_dense(&self) -> Result<()> {
        if self.is_dense() {
            return Ok(());
        }
        Err(GraderError::provider_unavailable(format!(
            "dense embeddings are required but unavailable: {}",
            self.fallback_reason()
                .unwrap_or("no embedding provider configured")
        )))
    }

    /// Vector for a word in the space's mode.
    pub fn compute_embedding(&self, word: &str) -> Result<VectorRepresentation> {
        match &self.provider {
            Some(provider) => Ok(VectorRepresentation::Dense(provider.embed(word)?)),
            None => Ok(VectorRepresentation::Sparse(Self::compute_char_vector(word))),
        }
    }

    /// Character-frequency vector, regardless of mode.
    pub fn compute_char_vector(word: &str) -> SparseVector {
        SparseVector::char_frequencies(word)
    }

    /// Cosine similarity of any two representations (0.0 when incomparable
    /// or when either has zero norm).
    pub fn cosine_similarity(&self, a: &VectorRepresentation, b: &VectorRepresentation) -> f64 {
        a.cosine_similarity(b)
    }

    /// Cosine similarity, failing for incomparable representations.
    pub fn try_cosine_similarity(
        &self,
        a: &VectorRepresentation,
        b: &VectorRepresentation,
    ) -> Result<f64> {
        a.try_cosine_similarity(b)
    }
}

/// Corpus words and test targets the table has no vector for, in config
/// order.
fn uncovered_words(table: &WordVectorTable, config: &GraderConfig) -> Vec<String> {
    let mut seen = FxHashSet::default();
    config
        .corpus
        .iter()
        .chain(config.test_cases.iter().map(|case| &case.target))
        .map(|word| normalize_word(word))
        .filter(|word| !word.is_empty() && !table.contains(word))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

impl Default for VectorSpace {
    fn default() -> Self {
        Self::sparse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestCaseSpec;

    fn table() -> Arc<WordVectorTable> {
        Arc::new(
            WordVectorTable::from_entries(
                "test",
                [("cat", vec![1.0, 0.0]), ("dog", vec![0.8, 0.2])],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_sparse_mode() {
        let space = VectorSpace::sparse();
        assert_eq!(space.mode(), VectorKind::Sparse);
        let v = space.compute_embedding("cat").unwrap();
        assert_eq!(v.kind(), VectorKind::Sparse);
    }

    #[test]
    fn test_dense_mode() {
        let space = VectorSpace::dense(table());
        assert_eq!(space.mode(), VectorKind::Dense);
        assert_eq!(space.provider_name(), Some("test"));
        let v = space.compute_embedding("dog").unwrap();
        assert_eq!(v.kind(), VectorKind::Dense);
    }

    #[test]
    fn test_dense_unknown_word_propagates() {
        let space = VectorSpace::dense(table());
        let err = space.compute_embedding("zebra").unwrap_err();
        assert!(matches!(err, GraderError::UnknownWord { .. }));
    }

    #[test]
    fn test_from_config_without_table_falls_back() {
        let space = VectorSpace::from_config(&GraderConfig::default());
        assert!(!space.is_dense());
        assert!(space.fallback_reason().is_some());
    }

    #[test]
    fn test_ensure_dense() {
        assert!(VectorSpace::dense(table()).ensure_dense().is_ok());

        let config = GraderConfig::default().with_embeddings_path("/no/such/table.vec");
        let err = VectorSpace::from_config(&config).ensure_dense().unwrap_err();
        assert!(err.is_provider_unavailable());
        assert!(err.to_string().contains("/no/such/table.vec"));
    }

    #[test]
    fn test_from_config_with_missing_table_falls_back() {
        let config = GraderConfig::default().with_embeddings_path("/no/such/table.vec");
        let space = VectorSpace::from_config(&config);
        assert_eq!(space.mode(), VectorKind::Sparse);
        assert!(space.fallback_reason().unwrap().contains("/no/such/table.vec"));
    }

    #[test]
    fn test_from_config_with_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "cat 1 0\ndog 0 1\n").unwrap();
        let config = GraderConfig::default()
            .with_corpus(["cat", "dog"])
            .with_test_cases(vec![TestCaseSpec::new("Cat")])
            .with_embeddings_path(&path);
        let space = VectorSpace::from_config(&config);
        assert!(space.is_dense());
        assert!(space.fallback_reason().is_none());
    }

    #[test]
    fn test_from_config_with_incomplete_table_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "cat 1 0\ndog 0 1\n").unwrap();

        let config = GraderConfig::default()
            .with_corpus(["cat", "dog"])
            .with_test_cases(vec![TestCaseSpec::new("zebra")])
            .with_embeddings_path(&path);
        let space = VectorSpace::from_config(&config);
        assert_eq!(space.mode(), VectorKind::Sparse);
        assert!(space.fallback_reason().unwrap().contains("'zebra'"));

        let space = VectorSpace::from_config(&GraderConfig::default().with_embeddings_path(&path));
        assert!(!space.is_dense());
        assert!(space.fallback_reason().unwrap().contains("word(s) missing"));
    }
}
