//! Drives a [`CandidateStrategy`] through the structural check and the
//! per-case calls, turning faults into grading diagnostics.

use super::context::{Console, ExecutionContext};
use super::traits::{CandidateFault, CandidateOutput, CandidateStrategy, CapabilitySet, FaultKind};
use crate::grading::error_code::ErrorCode;
use crate::grading::errors::{CaseRuntimeError, StructuralError};
use crate::reference::TestCase;
use crate::types::{Corpus, RankingMap};
use crate::vector::VectorSpace;
use std::time::Duration;

/// Result of running one test case.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    /// The candidate returned a ranking with one entry per corpus word
    Returned { ranking: RankingMap },
    /// The candidate returned something unusable; the case fails
    Rejected {
        code: ErrorCode,
        message: String,
        actual_length: Option<usize>,
    },
    /// The candidate failed while running
    Failed(CaseRuntimeError),
}

/// Runs candidate strategies against test cases.
#[derive(Debug, Clone, Copy)]
pub struct CandidateExecutor<'a> {
    space: &'a VectorSpace,
    time_budget: Option<Duration>,
}

impl<'a> CandidateExecutor<'a> {
    /// An executor without a time budget
    pub fn new(space: &'a VectorSpace) -> Self {
        Self {
            space,
            time_budget: None,
        }
    }

    /// Builder method: bound every call by `budget`
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    fn context<'c>(&self, console: &'c mut Console) -> ExecutionContext<'c>
    where
        'a: 'c,
    {
        let ctx = ExecutionContext::new(self.space, console);
        match self.time_budget {
            Some(budget) => ctx.with_budget(budget),
            None => ctx,
        }
    }

    /// Verify the submission defines every required capability.
    ///
    /// Runs before any test case; an error here aborts the batch.
    pub fn check_structure(
        &self,
        strategy: &mut dyn CandidateStrategy,
        console: &mut Console,
    ) -> Result<CapabilitySet, StructuralError> {
        let mut ctx = self.context(console);
        let capabilities = strategy
            .capabilities(&mut ctx)
            .map_err(structural_error)?;

        match capabilities.first_missing() {
            Some(missing) => Err(StructuralError::missing_capability(missing.name())),
            None => Ok(capabilities),
        }
    }

    /// Run one test case.
    ///
    /// The strategy receives its own copy of the corpus. A mapping whose size
    /// differs from the corpus is rejected here; finer checks (missing words,
    /// duplicate ranks) are left to validation.
    pub fn execute_case(
        &self,
        strategy: &mut dyn CandidateStrategy,
        console: &mut Console,
        test_number: usize,
        case: &TestCase,
        corpus: &Corpus,
    ) -> CaseOutcome {
        let words = corpus.to_vec();
        let mut ctx = self.context(console);

        // In-process strategies only see the budget when they call back into
        // the context, so a late answer still counts as a timeout.
        let result = strategy
            .rank_words_by_similarity(&mut ctx, case.target(), words)
            .and_then(|output| ctx.check_budget().map(|_| output));

        match result {
            Ok(CandidateOutput::Ranking(ranking)) if ranking.len() == corpus.len() => {
                CaseOutcome::Returned { ranking }
            }
            Ok(CandidateOutput::Ranking(ranking)) => CaseOutcome::Rejected {
                code: ErrorCode::CardinalityMismatch,
                message: format!(
                    "Expected {} words in ranking, got {}",
                    corpus.len(),
                    ranking.len()
                ),
                actual_length: Some(ranking.len()),
            },
            Ok(CandidateOutput::Unexpected { kind }) => CaseOutcome::Rejected {
                code: ErrorCode::InvalidOutputType,
                message: format!("Expected a word-to-rank mapping, got {}", kind),
                actual_length: None,
            },
            Err(fault) => {
                let err = runtime_error(test_number, fault);
                trace_event!(debug, test_number, code = %err.code, error = %err.message, "candidate case failed");
                CaseOutcome::Failed(err)
            }
        }
    }
}

fn structural_error(fault: CandidateFault) -> StructuralError {
    let err = match fault.kind {
        FaultKind::Unavailable => StructuralError::new(
            ErrorCode::SandboxUnavailable,
            format!("Your code could not be started: {}", fault.message),
        )
        .with_hint(
            "check sandbox.interpreter; with bubblewrap isolation, bwrap must be installed",
        ),
        _ => StructuralError::new(
            ErrorCode::InvalidSubmission,
            format!("Your code failed to load: {}", fault.message),
        ),
    };

    match fault.trace {
        Some(trace) => err.with_trace(trace),
        None => err,
    }
}

fn runtime_error(test_number: usize, fault: CandidateFault) -> CaseRuntimeError {
    let err = match fault.kind {
        FaultKind::Raised => CaseRuntimeError::new(
            ErrorCode::RuntimeError,
            test_number,
            format!("Runtime error: {}", fault.message),
        ),
        FaultKind::TimedOut => {
            CaseRuntimeError::new(ErrorCode::TimeBudgetExceeded, test_number, fault.message)
                .with_hint("compute the target embedding once and reuse it for every word")
        }
        FaultKind::Crashed => {
            CaseRuntimeError::new(ErrorCode::CandidateCrashed, test_number, fault.message)
        }
        FaultKind::Protocol => {
            CaseRuntimeError::new(ErrorCode::ProtocolViolation, test_number, fault.message)
        }
        FaultKind::Unavailable => CaseRuntimeError::new(
            ErrorCode::CandidateCrashed,
            test_number,
            format!("candidate could not be started: {}", fault.message),
        ),
    };
    err.with_trace(fault.trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::traits::{Capability, RankFn};
    use crate::reference::ReferenceRankingGenerator;
    use crate::types::Rank;

    struct HalfDefined;

    impl CandidateStrategy for HalfDefined {
        fn capabilities(
            &mut self,
            _ctx: &mut ExecutionContext<'_>,
        ) -> Result<CapabilitySet, CandidateFault> {
            Ok(CapabilitySet::empty().with(Capability::ComputeEmbedding))
        }

        fn rank_words_by_similarity(
            &mut self,
            _ctx: &mut ExecutionContext<'_>,
            _target: &str,
            _words: Vec<String>,
        ) -> Result<CandidateOutput, CandidateFault> {
            Err(CandidateFault::raised("unreachable"))
        }
    }

    fn fixture() -> (VectorSpace, Corpus, TestCase) {
        let space = VectorSpace::sparse();
        let corpus = Corpus::new(["cat", "dog", "act"]).unwrap();
        let reference = ReferenceRankingGenerator::new(&space)
            .generate("cat", &corpus)
            .unwrap();
        let case = TestCase::new("cat", "Find words similar to 'cat'", reference);
        (space, corpus, case)
    }

    fn identity(words: &[String]) -> RankingMap {
        RankingMap::from_pairs(
            words
                .iter()
                .enumerate()
                .map(|(idx, w)| (w.clone(), idx as Rank + 1)),
        )
    }

    #[test]
    fn test_missing_capability_is_structural() {
        let space = VectorSpace::sparse();
        let mut console = Console::new(1024);
        let err = CandidateExecutor::new(&space)
            .check_structure(&mut HalfDefined, &mut console)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingCapability);
        assert!(err.message.contains("rank_words_by_similarity"));
    }

    #[test]
    fn test_returned_ranking() {
        let (space, corpus, case) = fixture();
        let mut console = Console::new(1024);
        let mut strategy = RankFn::new(|_ctx: &mut ExecutionContext<'_>, _t: &str, words: Vec<String>| {
            Ok(identity(&words).into())
        });

        let outcome = CandidateExecutor::new(&space).execute_case(
            &mut strategy,
            &mut console,
            1,
            &case,
            &corpus,
        );
        assert!(matches!(outcome, CaseOutcome::Returned { .. }));
    }

    #[test]
    fn test_corpus_mutation_does_not_leak() {
        let (space, corpus, case) = fixture();
        let mut console = Console::new(1024);
        let mut strategy = RankFn::new(|_ctx: &mut ExecutionContext<'_>, _t: &str, mut words: Vec<String>| {
            words.reverse();
            words.push("intruder".to_string());
            words.pop();
            Ok(identity(&words).into())
        });
        let executor = CandidateExecutor::new(&space);
        executor.execute_case(&mut strategy, &mut console, 1, &case, &corpus);
        assert_eq!(corpus.words(), &["cat", "dog", "act"]);
    }

    #[test]
    fn test_cardinality_mismatch_is_rejected() {
        let (space, corpus, case) = fixture();
        let mut console = Console::new(1024);
        let mut strategy = RankFn::new(|_ctx: &mut ExecutionContext<'_>, _t: &str, _w: Vec<String>| {
            Ok(RankingMap::from_pairs([("cat", 1)]).into())
        });

        let outcome = CandidateExecutor::new(&space).execute_case(
            &mut strategy,
            &mut console,
            1,
            &case,
            &corpus,
        );
        assert_eq!(
            outcome,
            CaseOutcome::Rejected {
                code: ErrorCode::CardinalityMismatch,
                message: "Expected 3 words in ranking, got 1".to_string(),
                actual_length: Some(1),
            }
        );
    }

    #[test]
    fn test_unexpected_output_is_rejected() {
        let (space, corpus, case) = fixture();
        let mut console = Console::new(1024);
        let mut strategy = RankFn::new(|_ctx: &mut ExecutionContext<'_>, _t: &str, _w: Vec<String>| {
            Ok(CandidateOutput::Unexpected {
                kind: "list".to_string(),
            })
        });

        let outcome = CandidateExecutor::new(&space).execute_case(
            &mut strategy,
            &mut console,
            1,
            &case,
            &corpus,
        );
        let CaseOutcome::Rejected { code, message, .. } = outcome else {
            panic!("expected a rejection");
        };
        assert_eq!(code, ErrorCode::InvalidOutputType);
        assert_eq!(message, "Expected a word-to-rank mapping, got list");
    }

    #[test]
    fn test_raised_fault_becomes_runtime_error() {
        let (space, corpus, case) = fixture();
        let mut console = Console::new(1024);
        let mut strategy = RankFn::new(|_ctx: &mut ExecutionContext<'_>, _t: &str, _w: Vec<String>| {
            Err(CandidateFault::raised("division by zero").with_trace(Some("line 4".into())))
        });

        let outcome = CandidateExecutor::new(&space).execute_case(
            &mut strategy,
            &mut console,
            2,
            &case,
            &corpus,
        );
        let CaseOutcome::Failed(err) = outcome else {
            panic!("expected a runtime failure");
        };
        assert_eq!(err.code, ErrorCode::RuntimeError);
        assert_eq!(err.test_number, 2);
        assert_eq!(err.message, "Runtime error: division by zero");
        assert_eq!(err.trace.as_deref(), Some("line 4"));
    }

    #[test]
    fn test_late_answer_times_out() {
        let (space, corpus, case) = fixture();
        let mut console = Console::new(1024);
        let mut strategy = RankFn::new(|_ctx: &mut ExecutionContext<'_>, _t: &str, words: Vec<String>| {
            std::thread::sleep(Duration::from_millis(30));
            Ok(identity(&words).into())
        });

        let outcome = CandidateExecutor::new(&space)
            .with_time_budget(Duration::from_millis(5))
            .execute_case(&mut strategy, &mut console, 1, &case, &corpus);
        let CaseOutcome::Failed(err) = outcome else {
            panic!("expected a timeout");
        };
        assert_eq!(err.code, ErrorCode::TimeBudgetExceeded);
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_unavailable_sandbox_is_sandbox_error() {
        let err = structural_error(CandidateFault::unavailable("no such file"));
        assert_eq!(err.code, ErrorCode::SandboxUnavailable);

        let err = structural_error(
            CandidateFault::crashed("exited").with_trace(Some("SyntaxError".into())),
        );
        assert_eq!(err.code, ErrorCode::InvalidSubmission);
        assert_eq!(err.trace.as_deref(), Some("SyntaxError"));
    }
}
