//! Stable error codes for grading diagnostics.
//!
//! Codes serialize as snake_case strings and never change meaning, so
//! clients can match on them instead of on message text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable classification of a grading diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // ─── Structural (batch-aborting) ────────────────────────────────────
    /// A required capability is not defined by the submission
    MissingCapability,
    /// The dense embedding provider is required but unavailable
    ProviderUnavailable,
    /// The submission source is empty
    EmptySubmission,
    /// The sandbox could not be prepared or the candidate could not be started
    SandboxUnavailable,
    /// The submission failed while loading (syntax error, crash, or timeout
    /// during the capability check)
    InvalidSubmission,

    // ─── Runtime (per case) ─────────────────────────────────────────────
    /// The candidate raised an error while ranking
    RuntimeError,
    /// The candidate ran past its time budget
    TimeBudgetExceeded,
    /// The candidate process exited without answering
    CandidateCrashed,
    /// The candidate sent a message the grader cannot interpret
    ProtocolViolation,

    // ─── Output shape (per case) ────────────────────────────────────────
    /// The candidate returned something other than a word-to-rank mapping
    InvalidOutputType,
    /// The ranking does not have one entry per corpus word
    CardinalityMismatch,

    // ─── Ranking validation (warnings unless strict) ────────────────────
    /// Corpus words absent from the ranking
    MissingWords,
    /// Ranked words that are not in the corpus
    ExtraneousWords,
    /// Two or more words share a rank
    DuplicateRank,
    /// A rank lies outside `1..=N`
    RankOutOfRange,
}

impl ErrorCode {
    /// The snake_case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingCapability => "missing_capability",
            ErrorCode::ProviderUnavailable => "provider_unavailable",
            ErrorCode::EmptySubmission => "empty_submission",
            ErrorCode::SandboxUnavailable => "sandbox_unavailable",
            ErrorCode::InvalidSubmission => "invalid_submission",
            ErrorCode::RuntimeError => "runtime_error",
            ErrorCode::TimeBudgetExceeded => "time_budget_exceeded",
            ErrorCode::CandidateCrashed => "candidate_crashed",
            ErrorCode::ProtocolViolation => "protocol_violation",
            ErrorCode::InvalidOutputType => "invalid_output_type",
            ErrorCode::CardinalityMismatch => "cardinality_mismatch",
            ErrorCode::MissingWords => "missing_words",
            ErrorCode::ExtraneousWords => "extraneous_words",
            ErrorCode::DuplicateRank => "duplicate_rank",
            ErrorCode::RankOutOfRange => "rank_out_of_range",
        }
    }

    /// Whether this code aborts the whole batch
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ErrorCode::MissingCapability
                | ErrorCode::ProviderUnavailable
                | ErrorCode::EmptySubmission
                | ErrorCode::SandboxUnavailable
                | ErrorCode::InvalidSubmission
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
