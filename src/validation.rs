//! Validation engine for candidate rankings.
//!
//! The engine runs every registered [`ValidationRule`] against a ranking
//! and collects all findings into a [`ValidationReport`]; it never stops at
//! the first problem, so learners see everything that is wrong at once.
//!
//! Findings are warnings in [`ValidationMode::Lenient`] (the comparator's
//! missing-rank penalty already scores them) and errors in
//! [`ValidationMode::Strict`], where any error fails the case.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use word_rank_grader::validation::ValidationEngine;
//!
//! let engine = ValidationEngine::with_defaults(ValidationMode::Strict);
//! let report = engine.validate(&ranking, &corpus);
//! if report.has_errors() {
//!     for diag in report.errors() {
//!         eprintln!("{diag}");
//!     }
//! }
//! ```

use crate::grading::error_code::ErrorCode;
use crate::types::{Corpus, Rank, RankingMap, ValidationMode};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Words listed in a diagnostic message before it is elided.
const SAMPLE_LIMIT: usize = 5;

// ─── Severity ───────────────────────────────────────────────────────────────

/// Whether a diagnostic fails the case or only informs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl From<ValidationMode> for Severity {
    fn from(mode: ValidationMode) -> Self {
        match mode {
            ValidationMode::Strict => Severity::Error,
            ValidationMode::Lenient => Severity::Warning,
        }
    }
}

// ─── Diagnostic ─────────────────────────────────────────────────────────────

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationDiagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ValidationDiagnostic {
    pub fn new(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Collected diagnostics from running all validation rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    /// Iterate over error-severity diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    /// Iterate over warning-severity diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Returns `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Returns `true` if there are no errors (warnings are acceptable).
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// Total number of diagnostics.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Returns `true` if there are no diagnostics at all.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Messages of all error diagnostics joined into one line.
    pub fn error_summary(&self) -> String {
        self.errors()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ─── Rule trait ─────────────────────────────────────────────────────────────

/// A single rule that inspects a ranking and returns zero or more
/// diagnostics at the given severity.
///
/// Rules are stateless and `Send + Sync` so one engine can serve
/// concurrent grading requests.
pub trait ValidationRule: Send + Sync {
    /// Short, stable identifier for this rule (e.g., `"duplicate_rank"`).
    fn name(&self) -> &str;

    /// Inspect `ranking` against `corpus`.
    fn validate(
        &self,
        ranking: &RankingMap,
        corpus: &Corpus,
        severity: Severity,
    ) -> Vec<ValidationDiagnostic>;
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Runs a set of [`ValidationRule`]s and collects their diagnostics.
pub struct ValidationEngine {
    severity: Severity,
    rules: Vec<Box<dyn ValidationRule>>,
}

impl ValidationEngine {
    /// Create an engine with no rules.
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            severity: mode.into(),
            rules: Vec::new(),
        }
    }

    /// Create an engine pre-loaded with the default rule set.
    pub fn with_defaults(mode: ValidationMode) -> Self {
        let mut engine = Self::new(mode);
        engine.add_rule(Box::new(MissingWordsRule));
        engine.add_rule(Box::new(ExtraneousWordsRule));
        engine.add_rule(Box::new(DuplicateRankRule));
        engine.add_rule(Box::new(RankRangeRule));
        engine
    }

    /// Register an additional rule.
    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    /// Names of the registered rules, in run order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run all rules and return the collected report.
    pub fn validate(&self, ranking: &RankingMap, corpus: &Corpus) -> ValidationReport {
        let mut report = ValidationReport::default();
        for rule in &self.rules {
            report
                .diagnostics
                .extend(rule.validate(ranking, corpus, self.severity));
        }
        report
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::with_defaults(ValidationMode::default())
    }
}

impl fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("severity", &self.severity)
            .field("rules", &self.rule_names())
            .finish()
    }
}

/// `"a, b, c"`, or `"a, b, c, d, e and 3 more"`.
fn sample(mut words: Vec<&str>) -> String {
    words.sort_unstable();
    let extra = words.len().saturating_sub(SAMPLE_LIMIT);
    words.truncate(SAMPLE_LIMIT);
    let listed = words.join(", ");
    if extra > 0 {
        format!("{} and {} more", listed, extra)
    } else {
        listed
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Concrete rules
// ═══════════════════════════════════════════════════════════════════════════

// ─── 1. every corpus word is ranked ─────────────────────────────────────────

struct MissingWordsRule;

impl ValidationRule for MissingWordsRule {
    fn name(&self) -> &str {
        "missing_words"
    }

    fn validate(
        &self,
        ranking: &RankingMap,
        corpus: &Corpus,
        severity: Severity,
    ) -> Vec<ValidationDiagnostic> {
        let missing: Vec<&str> = corpus.iter().filter(|w| !ranking.contains(w)).collect();
        if missing.is_empty() {
            return vec![];
        }

        vec![ValidationDiagnostic::new(
            severity,
            ErrorCode::MissingWords,
            format!(
                "{} corpus word(s) missing from the ranking: {}",
                missing.len(),
                sample(missing)
            ),
        )
        .with_hint("Rank every word you were given, including the target itself")]
    }
}

// ─── 2. no words outside the corpus ─────────────────────────────────────────

struct ExtraneousWordsRule;

impl ValidationRule for ExtraneousWordsRule {
    fn name(&self) -> &str {
        "extraneous_words"
    }

    fn validate(
        &self,
        ranking: &RankingMap,
        corpus: &Corpus,
        severity: Severity,
    ) -> Vec<ValidationDiagnostic> {
        let extra: Vec<&str> = ranking
            .iter()
            .map(|(w, _)| w)
            .filter(|w| !corpus.contains(w))
            .collect();
        if extra.is_empty() {
            return vec![];
        }

        vec![ValidationDiagnostic::new(
            severity,
            ErrorCode::ExtraneousWords,
            format!(
                "{} ranked word(s) are not in the corpus: {}",
                extra.len(),
                sample(extra)
            ),
        )
        .with_hint("Use the words exactly as given; do not rename or add words")]
    }
}

// ─── 3. each rank used once ─────────────────────────────────────────────────

struct DuplicateRankRule;

impl ValidationRule for DuplicateRankRule {
    fn name(&self) -> &str {
        "duplicate_rank"
    }

    fn validate(
        &self,
        ranking: &RankingMap,
        _corpus: &Corpus,
        severity: Severity,
    ) -> Vec<ValidationDiagnostic> {
        let mut by_rank: FxHashMap<Rank, Vec<&str>> = FxHashMap::default();
        for (word, rank) in ranking.iter() {
            by_rank.entry(rank).or_default().push(word);
        }

        let mut shared: Vec<(Rank, Vec<&str>)> = by_rank
            .into_iter()
            .filter(|(_, words)| words.len() > 1)
            .collect();
        if shared.is_empty() {
            return vec![];
        }
        shared.sort_unstable_by_key(|(rank, _)| *rank);

        let count = shared.len();
        let (rank, words) = shared.swap_remove(0);
        vec![ValidationDiagnostic::new(
            severity,
            ErrorCode::DuplicateRank,
            format!(
                "{} rank(s) are shared by more than one word (rank {}: {})",
                count,
                rank,
                sample(words)
            ),
        )
        .with_hint("Assign ranks by position in the sorted list so every rank is unique")]
    }
}

// ─── 4. ranks lie in 1..=N ──────────────────────────────────────────────────

struct RankRangeRule;

impl ValidationRule for RankRangeRule {
    fn name(&self) -> &str {
        "rank_out_of_range"
    }

    fn validate(
        &self,
        ranking: &RankingMap,
        corpus: &Corpus,
        severity: Severity,
    ) -> Vec<ValidationDiagnostic> {
        let max = corpus.len() as Rank;
        let outside: Vec<&str> = ranking
            .iter()
            .filter(|(_, rank)| !(1..=max).contains(rank))
            .map(|(w, _)| w)
            .collect();
        if outside.is_empty() {
            return vec![];
        }

        vec![ValidationDiagnostic::new(
            severity,
            ErrorCode::RankOutOfRange,
            format!(
                "{} word(s) have a rank outside 1..={}: {}",
                outside.len(),
                max,
                sample(outside)
            ),
        )
        .with_hint("Ranks start at 1 for the most similar word")]
    }
}
