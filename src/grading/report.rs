//! Per-case results and the aggregate grading report.
//!
//! Everything here serializes to the JSON returned to learners. Metrics are
//! kept raw in [`Metrics`] and also rendered for display (percentages and
//! rank differences rounded to one decimal).

use super::error_code::ErrorCode;
use super::errors::{CaseRuntimeError, StructuralError};
use crate::comparator::Metrics;
use crate::reference::TestCase;
use crate::types::{RankingMap, ValidationMode};
use crate::validation::{ValidationDiagnostic, ValidationReport};
use crate::vector::VectorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Case state machine
// ============================================================================

/// Lifecycle of one test case.
///
/// ```text
/// PENDING ──► EXECUTING ──► SUCCESS
///    │                 └──► RUNTIME_ERROR
///    └──► STRUCTURAL_ERROR        (batch aborted before the case ran)
/// ```
///
/// Terminal states are never left; no case runs twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseState {
    Pending,
    Executing,
    Success,
    StructuralError,
    RuntimeError,
}

impl CaseState {
    /// Whether the state is final
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CaseState::Success | CaseState::StructuralError | CaseState::RuntimeError
        )
    }

    /// Whether moving to `next` is a legal transition
    pub fn can_advance_to(&self, next: CaseState) -> bool {
        matches!(
            (self, next),
            (CaseState::Pending, CaseState::Executing)
                | (CaseState::Pending, CaseState::StructuralError)
                | (CaseState::Executing, CaseState::Success)
                | (CaseState::Executing, CaseState::RuntimeError)
        )
    }
}

// ============================================================================
// Per-case result
// ============================================================================

/// Display form of [`Metrics`]: percentages and rank difference rounded to
/// one decimal place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub exact_accuracy: f64,
    pub rank_closeness: f64,
    pub top_10_accuracy: f64,
    pub avg_rank_diff: f64,
}

impl From<&Metrics> for ScoreSummary {
    fn from(m: &Metrics) -> Self {
        Self {
            exact_accuracy: round1(m.exact_accuracy * 100.0),
            rank_closeness: round1(m.rank_closeness * 100.0),
            top_10_accuracy: round1(m.top_k_overlap * 100.0),
            avg_rank_diff: round1(m.avg_rank_diff),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `"word (rank N)"` strings for the `n` best-ranked words.
pub fn preview(ranking: &RankingMap, n: usize) -> Vec<String> {
    ranking
        .top_k(n)
        .into_iter()
        .map(|(word, rank)| format!("{} (rank {})", word, rank))
        .collect()
}

/// Outcome of one test case, owned by the request that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    /// 1-based position in the battery
    pub test_number: usize,
    pub target: String,
    pub description: String,
    pub state: CaseState,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    pub your_top_5: Vec<String>,
    pub expected_top_5: Vec<String>,
    pub expected_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl GradeResult {
    /// A case that has not run yet.
    pub fn pending(test_number: usize, case: &TestCase, corpus_len: usize) -> Self {
        Self {
            test_number,
            target: case.target().to_string(),
            description: case.description().to_string(),
            state: CaseState::Pending,
            passed: false,
            scores: None,
            metrics: None,
            your_top_5: Vec::new(),
            expected_top_5: Vec::new(),
            expected_length: corpus_len,
            actual_length: None,
            error: None,
            error_code: None,
            traceback: None,
            hint: None,
            diagnostics: Vec::new(),
        }
    }

    fn advance(&mut self, next: CaseState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal case transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    /// PENDING → EXECUTING
    pub fn begin(&mut self) {
        self.advance(CaseState::Executing);
    }

    /// EXECUTING → SUCCESS: the candidate returned a usable ranking.
    ///
    /// In strict mode a report with errors fails the case regardless of the
    /// metrics.
    pub fn complete(
        &mut self,
        metrics: Metrics,
        candidate: &RankingMap,
        reference: &RankingMap,
        preview_len: usize,
        validation: ValidationReport,
    ) {
        self.advance(CaseState::Success);
        self.actual_length = Some(candidate.len());
        self.your_top_5 = preview(candidate, preview_len);
        self.expected_top_5 = preview(reference, preview_len);
        self.scores = Some(ScoreSummary::from(&metrics));

        if validation.has_errors() {
            self.passed = false;
            self.error = Some(format!(
                "Ranking failed validation: {}",
                validation.error_summary()
            ));
            self.error_code = validation.errors().next().map(|d| d.code);
        } else {
            self.passed = metrics.passed;
        }
        self.metrics = Some(metrics);
        self.diagnostics = validation.diagnostics;
    }

    /// EXECUTING → RUNTIME_ERROR: the candidate returned something unusable.
    pub fn reject(
        &mut self,
        code: ErrorCode,
        message: String,
        actual_length: Option<usize>,
        reference: &RankingMap,
        preview_len: usize,
    ) {
        self.advance(CaseState::RuntimeError);
        self.passed = false;
        self.error = Some(message);
        self.error_code = Some(code);
        self.actual_length = actual_length;
        self.expected_top_5 = preview(reference, preview_len);
    }

    /// EXECUTING → RUNTIME_ERROR: the candidate failed while running.
    pub fn fail(&mut self, err: CaseRuntimeError) {
        self.advance(CaseState::RuntimeError);
        self.passed = false;
        self.error = Some(err.message);
        self.error_code = Some(err.code);
        self.traceback = err.trace;
        self.hint = err.hint;
    }

    /// PENDING → STRUCTURAL_ERROR: the batch was aborted.
    pub fn abort(&mut self) {
        self.advance(CaseState::StructuralError);
        self.passed = false;
    }
}

// ============================================================================
// Aggregate report
// ============================================================================

/// Overall outcome of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingStatus {
    /// Every case passed
    Success,
    /// At least one case passed
    Partial,
    /// No case passed
    Failed,
    /// A structural error aborted the batch
    Error,
}

impl GradingStatus {
    /// Status for `passed` out of `total` evaluated cases
    pub fn from_counts(passed: usize, total: usize) -> Self {
        if total > 0 && passed == total {
            GradingStatus::Success
        } else if passed > 0 {
            GradingStatus::Partial
        } else {
            GradingStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GradingStatus::Success => "success",
            GradingStatus::Partial => "partial",
            GradingStatus::Failed => "failed",
            GradingStatus::Error => "error",
        }
    }
}

impl fmt::Display for GradingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The response for one graded submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingReport {
    pub status: GradingStatus,
    pub message: String,
    pub passed_count: usize,
    pub total_count: usize,
    /// Representation the grader used for embeddings
    pub vector_mode: VectorKind,
    pub validation: ValidationMode,
    pub results: Vec<GradeResult>,
    pub console_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural_error: Option<StructuralError>,
}

impl GradingReport {
    /// Aggregate finished cases.
    pub fn from_results(
        results: Vec<GradeResult>,
        console_output: String,
        vector_mode: VectorKind,
        validation: ValidationMode,
    ) -> Self {
        let passed_count = results.iter().filter(|r| r.passed).count();
        let total_count = results.len();
        let message = if passed_count > 0 {
            format!("Passed {}/{} test cases", passed_count, total_count)
        } else {
            "No tests passed. Check your implementation.".to_string()
        };

        Self {
            status: GradingStatus::from_counts(passed_count, total_count),
            message,
            passed_count,
            total_count,
            vector_mode,
            validation,
            results,
            console_output,
            structural_error: None,
        }
    }

    /// A batch aborted by a structural error; every case is left unevaluated.
    pub fn structural(
        err: StructuralError,
        results: Vec<GradeResult>,
        console_output: String,
        vector_mode: VectorKind,
        validation: ValidationMode,
    ) -> Self {
        Self {
            status: GradingStatus::Error,
            message: err.message.clone(),
            passed_count: 0,
            total_count: results.len(),
            vector_mode,
            validation,
            results,
            console_output,
            structural_error: Some(err),
        }
    }

    /// Whether every case passed
    pub fn all_passed(&self) -> bool {
        self.status == GradingStatus::Success
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
