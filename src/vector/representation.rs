//! Vector representations and cosine similarity
//!
//! A word is represented either by a sparse character-frequency vector or by
//! a dense embedding. Similarity dispatches on the variant; there is no
//! shape sniffing.

use crate::errors::{GraderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which kind of representation a vector is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorKind {
    Sparse,
    Dense,
}

impl fmt::Display for VectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorKind::Sparse => write!(f, "sparse"),
            VectorKind::Dense => write!(f, "dense"),
        }
    }
}

// ============================================================================
// Sparse
// ============================================================================

/// Character → normalized frequency.
///
/// Keys are kept ordered so every reduction sums in the same order no matter
/// which operand drives the iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SparseVector {
    weights: BTreeMap<char, f64>,
}

impl SparseVector {
    /// Create from explicit weights
    pub fn from_weights(weights: BTreeMap<char, f64>) -> Self {
        Self { weights }
    }

    /// Frequency of each distinct character of the lower-cased word, divided
    /// by the word's length. An empty word yields an empty (zero-norm) vector.
    pub fn char_frequencies(word: &str) -> Self {
        let lowered = word.to_lowercase();
        let total = lowered.chars().count();
        let mut weights = BTreeMap::new();
        if total == 0 {
            return Self { weights };
        }

        for c in lowered.chars() {
            *weights.entry(c).or_insert(0.0) += 1.0;
        }
        for value in weights.values_mut() {
            *value /= total as f64;
        }

        Self { weights }
    }

    /// Weight of a character (0.0 when absent)
    pub fn get(&self, c: char) -> f64 {
        self.weights.get(&c).copied().unwrap_or(0.0)
    }

    /// Number of non-zero entries
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the vector has no entries
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Iterate over `(char, weight)` in character order
    pub fn iter(&self) -> impl Iterator<Item = (char, f64)> + '_ {
        self.weights.iter().map(|(&c, &w)| (c, w))
    }

    /// Dot product over the union of keys; missing keys count as zero.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        // Only shared keys contribute, and both maps yield them in key order.
        self.weights
            .iter()
            .filter_map(|(c, a)| other.weights.get(c).map(|b| a * b))
            .sum()
    }

    /// Euclidean norm of this vector's own values
    pub fn norm(&self) -> f64 {
        self.weights.values().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Cosine similarity; 0.0 when either norm is zero.
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        ratio(self.dot(other), self.norm(), other.norm())
    }
}

// ============================================================================
// Dense
// ============================================================================

/// A fixed-length embedding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DenseVector {
    values: Vec<f32>,
}

impl DenseVector {
    /// Wrap raw values
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Raw values
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Dimension
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has zero dimensions
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Dot product (accumulated in f64). Dimensions must match.
    pub fn dot(&self, other: &DenseVector) -> Result<f64> {
        if self.len() != other.len() {
            return Err(GraderError::incompatible_vectors(format!(
                "dense dimensions differ ({} vs {})",
                self.len(),
                other.len()
            )));
        }
        Ok(self
            .values
            .iter()
            .zip(&other.values)
            .map(|(&a, &b)| a as f64 * b as f64)
            .sum())
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        self.values
            .iter()
            .map(|&v| (v as f64) * (v as f64))
            .sum::<f64>()
            .sqrt()
    }

    /// Cosine similarity; 0.0 when either norm is zero.
    pub fn cosine(&self, other: &DenseVector) -> Result<f64> {
        let dot = self.dot(other)?;
        Ok(ratio(dot, self.norm(), other.norm()))
    }
}

fn ratio(dot: f64, norm_a: f64, norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

// ============================================================================
// Tagged union
// ============================================================================

/// A word's vector, sparse or dense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum VectorRepresentation {
    Sparse(SparseVector),
    Dense(DenseVector),
}

impl VectorRepresentation {
    /// The representation kind
    pub fn kind(&self) -> VectorKind {
        match self {
            VectorRepresentation::Sparse(_) => VectorKind::Sparse,
            VectorRepresentation::Dense(_) => VectorKind::Dense,
        }
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        match self {
            VectorRepresentation::Sparse(v) => v.norm(),
            VectorRepresentation::Dense(v) => v.norm(),
        }
    }

    /// Cosine similarity, failing for pairs that share no basis
    /// (sparse vs dense, or dense vectors of different dimension).
    pub fn try_cosine_similarity(&self, other: &VectorRepresentation) -> Result<f64> {
        match (self, other) {
            (VectorRepresentation::Sparse(a), VectorRepresentation::Sparse(b)) => Ok(a.cosine(b)),
            (VectorRepresentation::Dense(a), VectorRepresentation::Dense(b)) => a.cosine(b),
            (a, b) => Err(GraderError::incompatible_vectors(format!(
                "cannot compare {} and {} vectors",
                a.kind(),
                b.kind()
            ))),
        }
    }

    /// Cosine similarity; incomparable pairs score 0.0.
    pub fn cosine_similarity(&self, other: &VectorRepresentation) -> f64 {
        self.try_cosine_similarity(other).unwrap_or(0.0)
    }
}

impl From<SparseVector> for VectorRepresentation {
    fn from(v: SparseVector) -> Self {
        VectorRepresentation::Sparse(v)
    }
}

impl From<DenseVector> for VectorRepresentation {
    fn from(v: DenseVector) -> Self {
        VectorRepresentation::Dense(v)
    }
}

/// Cosine similarity between two representations of any kind.
pub fn cosine_similarity(a: &VectorRepresentation, b: &VectorRepresentation) -> f64 {
    a.cosine_similarity(b)
}
