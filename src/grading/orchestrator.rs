//! Runs the test battery against one submission.
//!
//! A [`Grader`] is built once at start-up ([`Grader::warm_up`]), which is
//! when every reference ranking is computed. After that it is read-only and
//! can grade any number of submissions, concurrently if needed; each call to
//! [`Grader::grade`] owns its console, its results, and (for source
//! submissions) its sandboxed processes.

use super::error_code::ErrorCode;
use super::errors::StructuralError;
use super::report::{GradeResult, GradingReport};
use crate::candidate::{
    CandidateExecutor, CandidateStrategy, Capability, CaseOutcome, Console, ProcessCandidate,
};
use crate::comparator::RankComparator;
use crate::errors::{GraderError, Result};
use crate::reference::TestBattery;
use crate::types::GraderConfig;
use crate::validation::ValidationEngine;
use crate::vector::{VectorKind, VectorSpace};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One test case as shown to learners (no reference answer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseCase {
    pub target: String,
    pub description: String,
    pub word_count: usize,
}

/// Everything a learner needs to start the exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseInfo {
    pub words: Vec<String>,
    pub test_cases: Vec<ExerciseCase>,
    pub required_functions: Vec<String>,
    pub vector_mode: VectorKind,
}

/// The grading orchestrator.
#[derive(Debug)]
pub struct Grader {
    config: GraderConfig,
    space: VectorSpace,
    battery: Arc<TestBattery>,
    comparator: RankComparator,
    validation: ValidationEngine,
}

impl Grader {
    /// Choose the vector space from `config` and compute every reference
    /// ranking.
    pub fn warm_up(config: GraderConfig) -> Result<Self> {
        config.validate()?;
        let space = VectorSpace::from_config(&config);
        Self::with_space(config, space)
    }

    /// Like [`warm_up`](Self::warm_up) with an explicit vector space.
    pub fn with_space(config: GraderConfig, space: VectorSpace) -> Result<Self> {
        config.validate()?;
        let corpus = config.corpus()?;

        trace_event!(
            info,
            cases = config.test_cases.len(),
            words = corpus.len(),
            mode = %space.mode(),
            "computing reference rankings"
        );
        let battery = TestBattery::build(&space, corpus, &config.test_cases)?;
        trace_event!(info, cases = battery.len(), "reference rankings ready");

        Ok(Self {
            comparator: RankComparator::new(config.policy.clone()),
            validation: ValidationEngine::with_defaults(config.validation),
            config,
            space,
            battery: Arc::new(battery),
        })
    }

    /// The configuration the grader was built from
    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    /// The shared vector space
    pub fn space(&self) -> &VectorSpace {
        &self.space
    }

    /// The cached test battery
    pub fn battery(&self) -> &Arc<TestBattery> {
        &self.battery
    }

    /// Corpus and test cases, without reference answers.
    pub fn exercise(&self) -> ExerciseInfo {
        let corpus = self.battery.corpus();
        ExerciseInfo {
            words: corpus.to_vec(),
            test_cases: self
                .battery
                .cases()
                .iter()
                .map(|case| ExerciseCase {
                    target: case.target().to_string(),
                    description: case.description().to_string(),
                    word_count: corpus.len(),
                })
                .collect(),
            required_functions: Capability::REQUIRED
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            vector_mode: self.space.mode(),
        }
    }

    /// Grade source text in the process sandbox.
    pub fn grade_source(&self, source: &str) -> GradingReport {
        match ProcessCandidate::new(source, &self.config.sandbox) {
            Ok(mut candidate) => self.grade(&mut candidate),
            Err(GraderError::EmptyInput { .. }) => self.aborted(
                StructuralError::new(ErrorCode::EmptySubmission, "No code provided"),
                String::new(),
            ),
            Err(err) => self.aborted(
                StructuralError::new(
                    ErrorCode::SandboxUnavailable,
                    format!("Your code could not be prepared for execution: {}", err),
                ),
                String::new(),
            ),
        }
    }

    /// Grade a candidate strategy against every test case.
    ///
    /// Structural problems abort before any case runs. Otherwise every case
    /// runs exactly once, in battery order, and a failure in one case never
    /// affects the others.
    pub fn grade(&self, strategy: &mut dyn CandidateStrategy) -> GradingReport {
        let mut console = Console::new(self.config.sandbox.max_console_bytes);

        if self.config.require_dense && !self.space.is_dense() {
            let reason = self
                .space
                .fallback_reason()
                .unwrap_or("no embedding provider configured");
            return self.aborted(
                StructuralError::new(
                    ErrorCode::ProviderUnavailable,
                    format!("Dense embeddings are required but unavailable: {}", reason),
                )
                .with_hint("set embeddings_path to a readable word-vector file"),
                console.into_string(),
            );
        }

        let executor =
            CandidateExecutor::new(&self.space).with_time_budget(self.config.sandbox.time_budget());
        if let Err(err) = executor.check_structure(strategy, &mut console) {
            trace_event!(info, code = %err.code, "submission rejected before grading");
            return self.aborted(err, console.into_string());
        }

        let corpus = self.battery.corpus();
        let preview_len = self.config.policy.preview_len;
        let mut results = self.pending_results();

        for (case, result) in self.battery.cases().iter().zip(results.iter_mut()) {
            trace_span!(
                "grade_case",
                test_number = result.test_number,
                word = case.target()
            );
            result.begin();

            match executor.execute_case(strategy, &mut console, result.test_number, case, corpus) {
                CaseOutcome::Returned { ranking } => {
                    let metrics = self.comparator.compute(case.reference(), &ranking, corpus);
                    let validation = self.validation.validate(&ranking, corpus);
                    result.complete(metrics, &ranking, case.reference(), preview_len, validation);
                }
                CaseOutcome::Rejected {
                    code,
                    message,
                    actual_length,
                } => {
                    result.reject(code, message, actual_length, case.reference(), preview_len);
                }
                CaseOutcome::Failed(err) => result.fail(err),
            }
        }

        let report = GradingReport::from_results(
            results,
            console.into_string(),
            self.space.mode(),
            self.config.validation,
        );
        trace_event!(
            info,
            status = %report.status,
            passed = report.passed_count,
            total = report.total_count,
            "submission graded"
        );
        report
    }

    fn pending_results(&self) -> Vec<GradeResult> {
        let corpus_len = self.battery.corpus().len();
        self.battery
            .cases()
            .iter()
            .enumerate()
            .map(|(idx, case)| GradeResult::pending(idx + 1, case, corpus_len))
            .collect()
    }

    fn aborted(&self, err: StructuralError, console_output: String) -> GradingReport {
        let mut results = self.pending_results();
        for result in &mut results {
            result.abort();
        }
        GradingReport::structural(
            err,
            results,
            console_output,
            self.space.mode(),
            self.config.validation,
        )
    }
}
