//! Candidate submissions and their execution.
//!
//! - [`traits`] — the [`CandidateStrategy`] seam, capabilities, outputs and faults
//! - [`context`] — the restricted [`ExecutionContext`] and [`Console`] capture
//! - [`protocol`] — JSON-lines messages spoken by sandboxed candidates
//! - [`process`] — [`ProcessCandidate`], the out-of-process sandbox
//! - [`sandbox`] — process confinement, resource limits and group teardown
//! - [`executor`] — [`CandidateExecutor`], structural check and per-case runs
//! - [`reference_solution`] — [`ReferenceSolution`], the correct in-process strategy

pub mod context;
pub mod executor;
pub mod process;
pub mod protocol;
pub mod reference_solution;
pub mod sandbox;
pub mod traits;

pub use context::{Console, ExecutionContext};
pub use executor::{CandidateExecutor, CaseOutcome};
pub use process::{ProcessCandidate, PYTHON_RUNNER};
pub use reference_solution::ReferenceSolution;
pub use traits::{
    CandidateFault, CandidateOutput, CandidateStrategy, Capability, CapabilitySet, FaultKind,
    RankFn,
};
