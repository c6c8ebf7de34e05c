//! Core types for word_rank_grader
//!
//! This module defines the fundamental data structures used throughout the
//! library: normalized words, the ordered corpus, rankings, and the grader
//! configuration.

use crate::corpus;
use crate::errors::{GraderError, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Words
// ============================================================================

/// Normalize a word: surrounding whitespace removed, lower-cased.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

// ============================================================================
// Corpus
// ============================================================================

/// The fixed, ordered word list every test case ranks.
///
/// Order is significant: reference rankings break similarity ties by corpus
/// position. Words are normalized and unique. Cloning is cheap (shared
/// storage); handing words to candidate code goes through [`Corpus::to_vec`]
/// so the shared list can never be mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    words: Arc<[String]>,
}

impl Corpus {
    /// Build a corpus, normalizing every word.
    ///
    /// Fails if the list is empty, contains a blank word, or contains the
    /// same word twice after normalization.
    pub fn new<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = FxHashSet::default();
        let mut normalized = Vec::new();

        for (idx, word) in words.into_iter().enumerate() {
            let word = normalize_word(word.as_ref());
            if word.is_empty() {
                return Err(GraderError::invalid_config(format!(
                    "corpus word at position {} is blank",
                    idx
                )));
            }
            if !seen.insert(word.clone()) {
                return Err(GraderError::invalid_config(format!(
                    "corpus word '{}' appears more than once",
                    word
                )));
            }
            normalized.push(word);
        }

        if normalized.is_empty() {
            return Err(GraderError::empty_input("corpus has no words"));
        }

        Ok(Self {
            words: normalized.into(),
        })
    }

    /// The built-in corpus.
    pub fn builtin() -> Self {
        Self {
            words: corpus::builtin_words()
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
                .into(),
        }
    }

    /// Words in corpus order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Iterate over words in corpus order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|w| w.as_str())
    }

    /// Number of words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Always false for a constructed corpus
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Check whether a (normalized) word belongs to the corpus
    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    /// An owned copy of the word list
    pub fn to_vec(&self) -> Vec<String> {
        self.words.to_vec()
    }
}

// ============================================================================
// Rankings
// ============================================================================

/// A rank position. Well-formed rankings use `1..=N`; candidate output may
/// contain anything that fits in an integer.
pub type Rank = i64;

/// Mapping from word to rank (1 = most similar).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankingMap {
    ranks: FxHashMap<String, Rank>,
}

impl RankingMap {
    /// Create an empty ranking
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ranking with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ranks: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Build a ranking from `(word, rank)` pairs. Later pairs overwrite earlier ones.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Rank)>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for (word, rank) in pairs {
            map.insert(word, rank);
        }
        map
    }

    /// Set the rank of a word
    pub fn insert(&mut self, word: impl Into<String>, rank: Rank) -> Option<Rank> {
        self.ranks.insert(word.into(), rank)
    }

    /// Rank of a word, if present
    pub fn get(&self, word: &str) -> Option<Rank> {
        self.ranks.get(word).copied()
    }

    /// Whether the word has a rank
    pub fn contains(&self, word: &str) -> bool {
        self.ranks.contains_key(word)
    }

    /// Number of ranked words
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    /// Whether nothing is ranked
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Iterate over `(word, rank)` pairs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Rank)> {
        self.ranks.iter().map(|(w, &r)| (w.as_str(), r))
    }

    /// Entries sorted by rank ascending, ties broken by word.
    pub fn sorted(&self) -> Vec<(&str, Rank)> {
        let mut entries: Vec<(&str, Rank)> = self.iter().collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// The `k` best-ranked entries (lowest rank numbers).
    pub fn top_k(&self, k: usize) -> Vec<(&str, Rank)> {
        let mut entries = self.sorted();
        entries.truncate(k);
        entries
    }

    /// The set of the `k` best-ranked words.
    pub fn top_k_words(&self, k: usize) -> FxHashSet<&str> {
        self.top_k(k).into_iter().map(|(w, _)| w).collect()
    }
}

// ============================================================================
// Test case specification
// ============================================================================

/// A test target before its reference ranking is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseSpec {
    /// Word to rank the corpus against
    pub target: String,
    /// Human-readable description shown in reports
    #[serde(default)]
    pub description: String,
}

impl TestCaseSpec {
    /// Create a spec with the standard description
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        let description = format!("Find words similar to '{}'", target);
        Self {
            target,
            description,
        }
    }

    /// Builder method: set a custom description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Thresholds and window sizes of the pass policy.
///
/// A case passes when ANY one of the three heuristics clears its bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingPolicy {
    /// `exact_accuracy` must be strictly greater than this
    pub exact_accuracy_threshold: f64,
    /// `rank_closeness` must be strictly greater than this
    pub rank_closeness_threshold: f64,
    /// `top_k_overlap` must be at least this
    pub top_k_overlap_threshold: f64,
    /// Average rank displacement at which closeness reaches zero
    pub closeness_decay_span: f64,
    /// Size of the top-K window used for overlap
    pub top_k: usize,
    /// Number of entries shown in the top-N comparison preview
    pub preview_len: usize,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            exact_accuracy_threshold: 0.5,
            rank_closeness_threshold: 0.8,
            top_k_overlap_threshold: 0.8,
            closeness_decay_span: 50.0,
            top_k: 10,
            preview_len: 5,
        }
    }
}

impl GradingPolicy {
    /// Validate the policy
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("exact_accuracy_threshold", self.exact_accuracy_threshold),
            ("rank_closeness_threshold", self.rank_closeness_threshold),
            ("top_k_overlap_threshold", self.top_k_overlap_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GraderError::invalid_config(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        if !(self.closeness_decay_span > 0.0) {
            return Err(GraderError::invalid_config(
                "closeness_decay_span must be > 0",
            ));
        }

        if self.top_k == 0 {
            return Err(GraderError::invalid_config("top_k must be > 0"));
        }

        Ok(())
    }
}

/// How malformed candidate rankings are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Missing words, extra keys, duplicate and out-of-range ranks are
    /// reported as warnings; the metrics decide the grade.
    #[default]
    Lenient,
    /// Any of the above fails the case.
    Strict,
}

impl ValidationMode {
    /// Whether validation findings fail a case
    pub fn is_strict(&self) -> bool {
        matches!(self, ValidationMode::Strict)
    }
}

/// How a submission file is turned into a protocol-speaking process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionRunner {
    /// The bundled Python runner loads the submission, exposes the grader's
    /// helpers to it and speaks the protocol on its behalf.
    #[default]
    Python,
    /// The interpreter runs the submission file itself, which must speak the
    /// protocol.
    Direct,
}

/// How candidate processes are confined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Run under bubblewrap: fresh namespaces (no network), a read-only
    /// system, an empty `/tmp` and only the private working directory
    /// writable. Launching fails when bubblewrap is missing.
    #[default]
    Bubblewrap,
    /// Run the interpreter directly. Resource limits and process-group
    /// teardown still apply; the filesystem and network do not get confined.
    Unconfined,
}

/// Per-process resource limits applied before the interpreter starts.
///
/// The CPU-time limit is derived from the wall-clock budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Address-space limit in bytes
    pub max_memory_bytes: u64,
    /// Process limit (counted per user by the kernel)
    pub max_processes: u64,
    /// Largest file the candidate may write, in bytes
    pub max_file_bytes: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_bytes: 1024 * 1024 * 1024,
            max_processes: 256,
            max_file_bytes: 1024 * 1024,
        }
    }
}

/// Limits and launch settings for out-of-process candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Program and leading arguments; the runner (if any) and the submission
    /// file path are appended
    pub interpreter: Vec<String>,
    /// What the interpreter is asked to run
    pub runner: SubmissionRunner,
    /// Confinement around the interpreter
    pub isolation: Isolation,
    /// bubblewrap executable used by [`Isolation::Bubblewrap`]
    pub bubblewrap: String,
    /// Wall-clock budget per child process, in milliseconds
    pub time_budget_ms: u64,
    /// Upper bound on captured console output per submission
    pub max_console_bytes: usize,
    /// Kernel resource limits for each child
    pub limits: ResourceLimits,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: vec!["python3".to_string(), "-I".to_string()],
            runner: SubmissionRunner::Python,
            isolation: Isolation::Bubblewrap,
            bubblewrap: "bwrap".to_string(),
            time_budget_ms: 10_000,
            max_console_bytes: 64 * 1024,
            limits: ResourceLimits::default(),
        }
    }
}

impl SandboxConfig {
    /// Time budget as a [`Duration`]
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    /// CPU-time limit in whole seconds: the budget rounded up, plus one.
    pub fn cpu_seconds(&self) -> u64 {
        self.time_budget_ms.div_ceil(1000) + 1
    }

    /// Set the runner
    pub fn with_runner(mut self, runner: SubmissionRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Set the isolation
    pub fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Validate the sandbox settings
    pub fn validate(&self) -> Result<()> {
        match self.interpreter.first() {
            Some(program) if !program.trim().is_empty() => {}
            _ => {
                return Err(GraderError::invalid_config(
                    "sandbox.interpreter must name a program",
                ))
            }
        }

        if self.isolation == Isolation::Bubblewrap && self.bubblewrap.trim().is_empty() {
            return Err(GraderError::invalid_config(
                "sandbox.bubblewrap must name a program",
            ));
        }

        if self.time_budget_ms == 0 {
            return Err(GraderError::invalid_config(
                "sandbox.time_budget_ms must be > 0",
            ));
        }

        let limits = &self.limits;
        if limits.max_memory_bytes == 0 || limits.max_processes == 0 || limits.max_file_bytes == 0
        {
            return Err(GraderError::invalid_config(
                "sandbox.limits must all be > 0",
            ));
        }

        Ok(())
    }
}

/// Configuration for a grader instance.
///
/// Built once at start-up and passed by reference to every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    /// Ordered corpus words
    pub corpus: Vec<String>,
    /// Test battery targets
    pub test_cases: Vec<TestCaseSpec>,
    /// Word-vector table for the dense provider (sparse fallback when absent)
    pub embeddings_path: Option<PathBuf>,
    /// Refuse submissions when the dense provider is unavailable
    pub require_dense: bool,
    /// Treatment of malformed candidate rankings
    pub validation: ValidationMode,
    /// Pass policy
    pub policy: GradingPolicy,
    /// Out-of-process execution settings
    pub sandbox: SandboxConfig,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            corpus: corpus::builtin_words().iter().map(|w| w.to_string()).collect(),
            test_cases: corpus::builtin_test_cases(),
            embeddings_path: None,
            require_dense: false,
            validation: ValidationMode::Lenient,
            policy: GradingPolicy::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl GraderConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: GraderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GraderError::io(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.corpus()?;

        if self.test_cases.is_empty() {
            return Err(GraderError::invalid_config(
                "at least one test case is required",
            ));
        }

        for (idx, case) in self.test_cases.iter().enumerate() {
            if normalize_word(&case.target).is_empty() {
                return Err(GraderError::invalid_config(format!(
                    "test case {} has a blank target",
                    idx + 1
                )));
            }
        }

        self.policy.validate()?;
        self.sandbox.validate()?;

        Ok(())
    }

    /// The validated corpus
    pub fn corpus(&self) -> Result<Corpus> {
        Corpus::new(&self.corpus)
    }

    /// Builder method: replace the corpus
    pub fn with_corpus<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.corpus = words.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method: replace the test battery
    pub fn with_test_cases(mut self, cases: Vec<TestCaseSpec>) -> Self {
        self.test_cases = cases;
        self
    }

    /// Builder method: set the word-vector table path
    pub fn with_embeddings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.embeddings_path = Some(path.into());
        self
    }

    /// Builder method: require the dense provider
    pub fn with_require_dense(mut self, require: bool) -> Self {
        self.require_dense = require;
        self
    }

    /// Builder method: set validation mode
    pub fn with_validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    /// Builder method: set the pass policy
    pub fn with_policy(mut self, policy: GradingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builder method: set sandbox settings
    pub fn with_sandbox(mut self, sandbox: SandboxConfig) -> Self {
        self.sandbox = sandbox;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("  Cat "), "cat");
        assert_eq!(normalize_word("GUITAR"), "guitar");
        assert_eq!(normalize_word("   "), "");
    }

    #[test]
    fn test_corpus_normalizes_and_keeps_order() {
        let corpus = Corpus::new(["Dog", " cat", "Fox"]).unwrap();
        assert_eq!(corpus.words(), &["dog", "cat", "fox"]);
        assert!(corpus.contains("cat"));
        assert!(!corpus.contains("Cat"));
    }

    #[test]
    fn test_corpus_rejects_duplicates() {
        let err = Corpus::new(["apple", "orange", "ORANGE"]).unwrap_err();
        assert!(err.to_string().contains("'orange'"));
    }

    #[test]
    fn test_corpus_rejects_empty_and_blank() {
        assert!(Corpus::new(Vec::<String>::new()).is_err());
        assert!(Corpus::new(["cat", " "]).is_err());
    }

    #[test]
    fn test_corpus_copy_is_independent() {
        let corpus = Corpus::new(["a", "b"]).unwrap();
        let mut copy = corpus.to_vec();
        copy.clear();
        assert_eq!(corpus.len(), 2);
    }

    #[test]
    fn test_builtin_corpus_is_valid() {
        let builtin = Corpus::builtin();
        let rebuilt = Corpus::new(builtin.words()).unwrap();
        assert_eq!(builtin, rebuilt);
    }

    #[test]
    fn test_ranking_top_k_breaks_ties_by_word() {
        let ranking = RankingMap::from_pairs([("b", 1), ("a", 1), ("c", 2), ("d", 3)]);
        let top = ranking.top_k(3);
        assert_eq!(top, vec![("a", 1), ("b", 1), ("c", 2)]);
        assert_eq!(ranking.top_k(10).len(), 4);
    }

    #[test]
    fn test_ranking_serde_is_plain_object() {
        let ranking = RankingMap::from_pairs([("cat", 1)]);
        let json = serde_json::to_string(&ranking).unwrap();
        assert_eq!(json, r#"{"cat":1}"#);
    }

    #[test]
    fn test_config_validation() {
        let config = GraderConfig::default();
        assert!(config.validate().is_ok());

        let bad = GraderConfig::default().with_corpus(Vec::<String>::new());
        assert!(bad.validate().is_err());

        let bad = GraderConfig::default().with_test_cases(vec![]);
        assert!(bad.validate().is_err());

        let bad = GraderConfig::default().with_policy(GradingPolicy {
            top_k: 0,
            ..GradingPolicy::default()
        });
        assert!(bad.validate().is_err());

        let bad = GraderConfig::default().with_sandbox(SandboxConfig {
            time_budget_ms: 0,
            ..SandboxConfig::default()
        });
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_sandbox_defaults_are_confined() {
        let sandbox = SandboxConfig::default();
        assert_eq!(sandbox.runner, SubmissionRunner::Python);
        assert_eq!(sandbox.isolation, Isolation::Bubblewrap);
        assert_eq!(sandbox.cpu_seconds(), 11);

        let config = GraderConfig::from_json_str(
            r#"{"sandbox": {"isolation": "unconfined", "runner": "direct", "time_budget_ms": 1500}}"#,
        )
        .unwrap();
        assert_eq!(config.sandbox.isolation, Isolation::Unconfined);
        assert_eq!(config.sandbox.runner, SubmissionRunner::Direct);
        assert_eq!(config.sandbox.cpu_seconds(), 3);
        assert_eq!(config.sandbox.limits, ResourceLimits::default());

        let bad = GraderConfig::default().with_sandbox(SandboxConfig {
            bubblewrap: " ".to_string(),
            ..SandboxConfig::default()
        });
        assert!(bad.validate().is_err());

        let mut bad = SandboxConfig::default();
        bad.limits.max_processes = 0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = GraderConfig::from_json_str(
            r#"{"corpus": ["cat", "dog", "fox"], "validation": "strict"}"#,
        )
        .unwrap();
        assert_eq!(config.corpus.len(), 3);
        assert_eq!(config.validation, ValidationMode::Strict);
        assert_eq!(config.policy, GradingPolicy::default());
        assert_eq!(config.test_cases.len(), 5);
    }

    #[test]
    fn test_config_from_json_rejects_invalid() {
        let result = GraderConfig::from_json_str(r#"{"policy": {"top_k": 0}}"#);
        assert!(matches!(result, Err(GraderError::InvalidConfig { .. })));
    }

    #[test]
    fn test_test_case_spec_description() {
        let spec = TestCaseSpec::new("cat");
        assert_eq!(spec.description, "Find words similar to 'cat'");
    }
}
