//! Dense embedding providers
//!
//! The grader treats the embedding model as an external collaborator behind
//! [`EmbeddingProvider`]. [`WordVectorTable`] is the bundled implementation:
//! a precomputed word → vector table read from the common whitespace
//! separated text format (`word v1 v2 ... vd`, optional `count dim` header).

use crate::errors::{GraderError, Result};
use crate::types::normalize_word;
use crate::vector::representation::DenseVector;
use rustc_hash::FxHashMap;
use std::fmt;
use std::path::Path;

/// Source of dense, fixed-dimension word embeddings.
///
/// Implementations must be deterministic: the same word always yields the
/// same vector. Reference rankings are only reproducible if this holds.
pub trait EmbeddingProvider: Send + Sync + fmt::Debug {
    /// Short identifier for logs and reports
    fn name(&self) -> &str;

    /// Length of every vector this provider returns
    fn dimension(&self) -> usize;

    /// Embed a single word
    fn embed(&self, word: &str) -> Result<DenseVector>;
}

/// In-memory table of precomputed word vectors.
#[derive(Debug, Clone)]
pub struct WordVectorTable {
    name: String,
    dimension: usize,
    vectors: FxHashMap<String, Vec<f32>>,
}

impl WordVectorTable {
    /// Build a table from `(word, vector)` entries.
    ///
    /// Words are normalized; every vector must have the same, non-zero
    /// dimension. A repeated word keeps its last vector.
    pub fn from_entries<I, S>(name: impl Into<String>, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: AsRef<str>,
    {
        let mut vectors = FxHashMap::default();
        let mut dimension = None;

        for (word, vector) in entries {
            let word = normalize_word(word.as_ref());
            if word.is_empty() {
                return Err(GraderError::invalid_config("word vector entry has a blank word"));
            }
            match dimension {
                None if vector.is_empty() => {
                    return Err(GraderError::invalid_config(format!(
                        "vector for '{}' is empty",
                        word
                    )))
                }
                None => dimension = Some(vector.len()),
                Some(d) if d != vector.len() => {
                    return Err(GraderError::invalid_config(format!(
                        "vector for '{}' has dimension {}, expected {}",
                        word,
                        vector.len(),
                        d
                    )))
                }
                Some(_) => {}
            }
            vectors.insert(word, vector);
        }

        let dimension = dimension
            .ok_or_else(|| GraderError::empty_input("word vector table has no entries"))?;

        Ok(Self {
            name: name.into(),
            dimension,
            vectors,
        })
    }

    /// Parse the text format.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let rest: Vec<&str> = fields.collect();

            // word2vec-style header: "<count> <dim>"
            if line_no == 0
                && rest.len() == 1
                && word.parse::<usize>().is_ok()
                && rest[0].parse::<usize>().is_ok()
            {
                continue;
            }

            let vector = rest
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| {
                    GraderError::serialization(format!(
                        "line {}: bad vector component for '{}': {}",
                        line_no + 1,
                        word,
                        e
                    ))
                })?;
            entries.push((word.to_string(), vector));
        }

        Self::from_entries(name, entries)
    }

    /// Load a table from disk. Any failure means the dense provider is
    /// unavailable.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GraderError::provider_unavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "word-vectors".to_string());
        Self::parse(name, &text).map_err(|e| {
            GraderError::provider_unavailable(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Number of words in the table
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Whether a word has a vector
    pub fn contains(&self, word: &str) -> bool {
        self.vectors.contains_key(&normalize_word(word))
    }
}

impl EmbeddingProvider for WordVectorTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, word: &str) -> Result<DenseVector> {
        let key = normalize_word(word);
        self.vectors
            .get(&key)
            .map(|v| DenseVector::new(v.clone()))
            .ok_or_else(|| GraderError::unknown_word(key))
    }
}
