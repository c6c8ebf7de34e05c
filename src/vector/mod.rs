//! Word vectors and similarity.
//!
//! - [`representation`] — sparse/dense tagged union and cosine similarity
//! - [`provider`] — dense embedding providers
//! - [`space`] — the mode-aware [`VectorSpace`](space::VectorSpace)

pub mod provider;
pub mod representation;
pub mod space;

pub use provider::{EmbeddingProvider, WordVectorTable};
pub use representation::{
    cosine_similarity, DenseVector, SparseVector, VectorKind, VectorRepresentation,
};
pub use space::VectorSpace;
