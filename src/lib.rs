//! # word_rank_grader
//!
//! Automatic grading for word-similarity ranking exercises.
//!
//! A learner implements two functions, `compute_embedding(word)` and
//! `rank_words_by_similarity(target, words)`. The grader runs them against a
//! fixed battery of target words and compares each returned ranking with a
//! reference ranking computed from the same vector space.
//!
//! ## Features
//!
//! - **Two vector spaces**: dense word embeddings loaded from a word-vector
//!   table, or a character-frequency fallback chosen once at start-up
//! - **Sandboxed submissions**: source text runs in a confined child process
//!   with a cleared environment, resource limits and a hard time budget
//! - **Partial credit**: exact accuracy, rank closeness and top-K overlap,
//!   any one of which passes a case
//! - **Per-case isolation**: one failing case never affects the others
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use word_rank_grader::{Grader, GraderConfig, ReferenceSolution};
//!
//! let grader = Grader::warm_up(GraderConfig::default())?;
//! let report = grader.grade(&mut ReferenceSolution);
//! assert!(report.all_passed());
//! ```

// ---------------------------------------------------------------------------
// Conditional tracing support
// ---------------------------------------------------------------------------

/// Emit a tracing event (when the `tracing` feature is enabled). When
/// disabled, this is a no-op and the compiler eliminates it.
macro_rules! trace_event {
    ($level:ident, $($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        tracing::$level!($($arg)+);
    };
}

/// Enter a tracing span for the rest of the enclosing block (when the
/// `tracing` feature is enabled).
macro_rules! trace_span {
    ($name:literal $(, $($field:tt)+)?) => {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!($name $(, $($field)+)?).entered();
    };
}

pub mod candidate;
pub mod comparator;
pub mod corpus;
pub mod errors;
pub mod grading;
pub mod hints;
pub mod reference;
pub mod types;
pub mod validation;
pub mod vector;

// Re-export commonly used types
pub use errors::{GraderError, Result};
pub use types::{
    normalize_word, Corpus, GraderConfig, GradingPolicy, Isolation, Rank, RankingMap,
    ResourceLimits, SandboxConfig, SubmissionRunner, TestCaseSpec, ValidationMode,
};

// Re-export main functionality
pub use candidate::{
    CandidateExecutor, CandidateFault, CandidateOutput, CandidateStrategy, Capability,
    CapabilitySet, Console, ExecutionContext, ProcessCandidate, RankFn, ReferenceSolution,
};
pub use comparator::{Metrics, RankComparator, MISSING_RANK_PENALTY};
pub use grading::{
    CaseRuntimeError, CaseState, ErrorCode, ExerciseInfo, GradeResult, Grader, GradingReport,
    GradingStatus, StructuralError,
};
pub use reference::{ReferenceRankingGenerator, TestBattery, TestCase};
pub use validation::{ValidationEngine, ValidationReport};
pub use vector::{
    cosine_similarity, DenseVector, EmbeddingProvider, SparseVector, VectorKind,
    VectorRepresentation, VectorSpace, WordVectorTable,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
