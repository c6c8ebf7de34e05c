//! Grading diagnostics for structural and runtime failures.
//!
//! Two types cover the grading lifecycle:
//!
//! - [`StructuralError`] — problems with the submission as a whole (a missing
//!   capability, an unavailable provider). These abort the batch before any
//!   test case runs.
//! - [`CaseRuntimeError`] — a failure while one test case executes. The
//!   batch continues with the next case.
//!
//! Both carry a stable [`ErrorCode`], a human-readable `message`, and an
//! optional `hint`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error_code::ErrorCode;

// ─── Structural (batch-aborting) errors ─────────────────────────────────────

/// A submission-level failure found before any test case executes.
///
/// # Display format
///
/// ```text
/// [missing_capability] Function "rank_words_by_similarity" not found in your code
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct StructuralError {
    /// Stable error code for programmatic matching.
    pub code: ErrorCode,

    /// Human-readable description of the problem.
    pub message: String,

    /// Optional suggestion for how to fix the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    /// Diagnostic output (e.g. the capability check's stderr), when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl StructuralError {
    /// Create a new structural error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: None,
            trace: None,
        }
    }

    /// A required capability is not defined.
    pub fn missing_capability(name: &str) -> Self {
        Self::new(
            ErrorCode::MissingCapability,
            format!(
                "Function \"{}\" not found in your code. You must implement this function!",
                name
            ),
        )
    }

    /// Attach a hint suggesting how to fix the problem.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach diagnostic output.
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }
}

// ─── Runtime (per-case) errors ──────────────────────────────────────────────

/// A failure that occurred while executing one test case.
///
/// # Display format
///
/// ```text
/// [time_budget_exceeded] case 2: candidate exceeded its time budget of 10000 ms
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[{code}] case {test_number}: {message}")]
pub struct CaseRuntimeError {
    /// Stable error code for programmatic matching.
    pub code: ErrorCode,

    /// 1-based position of the case in the battery.
    pub test_number: usize,

    /// Human-readable description of the failure.
    pub message: String,

    /// Stack trace or stderr captured from the candidate, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,

    /// Optional suggestion for how to fix the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl CaseRuntimeError {
    /// Create a new runtime error.
    pub fn new(code: ErrorCode, test_number: usize, message: impl Into<String>) -> Self {
        Self {
            code,
            test_number,
            message: message.into(),
            trace: None,
            hint: None,
        }
    }

    /// Attach a trace.
    pub fn with_trace(mut self, trace: Option<String>) -> Self {
        self.trace = trace.filter(|t| !t.trim().is_empty());
        self
    }

    /// Attach a hint suggesting how to fix or work around the failure.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_error_display() {
        let err = StructuralError::missing_capability("compute_embedding");
        assert_eq!(
            err.to_string(),
            "[missing_capability] Function \"compute_embedding\" not found in your code. \
             You must implement this function!"
        );
    }

    #[test]
    fn test_structural_error_json_format() {
        let err = StructuralError::new(ErrorCode::ProviderUnavailable, "model not loaded")
            .with_hint("configure embeddings_path");
        let value: serde_json::Value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "provider_unavailable");
        assert_eq!(value["hint"], "configure embeddings_path");
        assert!(value.get("trace").is_none());
    }

    #[test]
    fn test_runtime_error_display() {
        let err = CaseRuntimeError::new(ErrorCode::RuntimeError, 2, "division by zero");
        assert_eq!(err.to_string(), "[runtime_error] case 2: division by zero");
    }

    #[test]
    fn test_runtime_error_drops_blank_trace() {
        let err = CaseRuntimeError::new(ErrorCode::CandidateCrashed, 1, "exited")
            .with_trace(Some("  \n".to_string()));
        assert!(err.trace.is_none());

        let err = CaseRuntimeError::new(ErrorCode::CandidateCrashed, 1, "exited")
            .with_trace(Some("Traceback: boom".to_string()));
        assert_eq!(err.trace.as_deref(), Some("Traceback: boom"));
    }

    #[test]
    fn test_runtime_error_serde_roundtrip() {
        let err = CaseRuntimeError::new(ErrorCode::TimeBudgetExceeded, 3, "too slow")
            .with_hint("avoid recomputing the target embedding");
        let json = serde_json::to_string(&err).unwrap();
        let back: CaseRuntimeError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
