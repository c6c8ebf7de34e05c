//! Grading: diagnostics, per-case results, and the orchestrator.

pub mod error_code;
pub mod errors;
pub mod orchestrator;
pub mod report;

pub use error_code::ErrorCode;
pub use errors::{CaseRuntimeError, StructuralError};
pub use orchestrator::{ExerciseCase, ExerciseInfo, Grader};
pub use report::{CaseState, GradeResult, GradingReport, GradingStatus, ScoreSummary};
