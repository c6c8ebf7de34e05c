//! The candidate strategy seam.
//!
//! A submission is anything that can report which capabilities it defines
//! and rank a word list against a target. In-process Rust strategies and
//! sandboxed child processes ([`ProcessCandidate`](super::process::ProcessCandidate))
//! implement the same trait, so the executor never needs to know which kind
//! it is driving.

use super::context::ExecutionContext;
use crate::errors::GraderError;
use crate::types::{Rank, RankingMap};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Capabilities
// ============================================================================

/// A named function every submission must define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ComputeEmbedding,
    RankWordsBySimilarity,
}

impl Capability {
    /// Capabilities checked before any test case runs, in check order.
    pub const REQUIRED: [Capability; 2] = [
        Capability::ComputeEmbedding,
        Capability::RankWordsBySimilarity,
    ];

    /// The function name a submission uses for this capability
    pub fn name(&self) -> &'static str {
        match self {
            Capability::ComputeEmbedding => "compute_embedding",
            Capability::RankWordsBySimilarity => "rank_words_by_similarity",
        }
    }

    /// Look up a capability by function name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::REQUIRED.into_iter().find(|c| c.name() == name.trim())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of capabilities a submission defines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    compute_embedding: bool,
    rank_words_by_similarity: bool,
}

impl CapabilitySet {
    /// No capabilities
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every required capability
    pub fn all() -> Self {
        Self {
            compute_embedding: true,
            rank_words_by_similarity: true,
        }
    }

    /// Build from reported function names; unknown names are ignored.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::empty();
        for name in names {
            if let Some(capability) = Capability::from_name(name.as_ref()) {
                set.insert(capability);
            }
        }
        set
    }

    /// Add a capability
    pub fn insert(&mut self, capability: Capability) {
        match capability {
            Capability::ComputeEmbedding => self.compute_embedding = true,
            Capability::RankWordsBySimilarity => self.rank_words_by_similarity = true,
        }
    }

    /// Builder method: add a capability
    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    /// Whether the capability is defined
    pub fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::ComputeEmbedding => self.compute_embedding,
            Capability::RankWordsBySimilarity => self.rank_words_by_similarity,
        }
    }

    /// The first required capability that is missing, in check order
    pub fn first_missing(&self) -> Option<Capability> {
        Capability::REQUIRED
            .into_iter()
            .find(|c| !self.contains(*c))
    }
}

// ============================================================================
// Output
// ============================================================================

/// What a candidate returned from `rank_words_by_similarity`.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOutput {
    /// A word → rank mapping (not necessarily well-formed)
    Ranking(RankingMap),
    /// Anything else; `kind` names what was returned
    Unexpected { kind: String },
}

impl CandidateOutput {
    /// Interpret a JSON value returned by an out-of-process candidate.
    ///
    /// Only an object whose values are all whole numbers is a ranking;
    /// `1.0` counts as rank 1.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        let object = match value {
            Value::Object(object) => object,
            Value::Null => return Self::unexpected("null"),
            Value::Bool(_) => return Self::unexpected("boolean"),
            Value::Number(_) => return Self::unexpected("number"),
            Value::String(_) => return Self::unexpected("string"),
            Value::Array(_) => return Self::unexpected("list"),
        };

        let mut ranking = RankingMap::with_capacity(object.len());
        for (word, rank) in object {
            match whole_rank(&rank) {
                Some(rank) => {
                    ranking.insert(word, rank);
                }
                None => {
                    return Self::unexpected(format!(
                        "mapping with a non-integer rank for '{}'",
                        word
                    ))
                }
            }
        }
        Self::Ranking(ranking)
    }

    fn unexpected(kind: impl Into<String>) -> Self {
        Self::Unexpected { kind: kind.into() }
    }
}

fn whole_rank(value: &serde_json::Value) -> Option<Rank> {
    if let Some(rank) = value.as_i64() {
        return Some(rank);
    }
    let float = value.as_f64()?;
    if float.fract() == 0.0 && float >= Rank::MIN as f64 && float < Rank::MAX as f64 {
        Some(float as Rank)
    } else {
        None
    }
}

impl From<RankingMap> for CandidateOutput {
    fn from(ranking: RankingMap) -> Self {
        Self::Ranking(ranking)
    }
}

// ============================================================================
// Faults
// ============================================================================

/// How a candidate invocation went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The candidate raised or returned an error
    Raised,
    /// The time budget ran out
    TimedOut,
    /// The candidate stopped without answering
    Crashed,
    /// The candidate broke the message protocol
    Protocol,
    /// The candidate could not be started at all
    Unavailable,
}

/// A failed candidate invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFault {
    pub kind: FaultKind,
    pub message: String,
    pub trace: Option<String>,
}

impl CandidateFault {
    fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            trace: None,
        }
    }

    /// The candidate raised an error
    pub fn raised(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Raised, message)
    }

    /// The budget ran out
    pub fn timed_out(budget: Duration) -> Self {
        Self::new(
            FaultKind::TimedOut,
            format!(
                "candidate exceeded its time budget of {} ms",
                budget.as_millis()
            ),
        )
    }

    /// The candidate stopped without answering
    pub fn crashed(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Crashed, message)
    }

    /// The candidate broke the protocol
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Protocol, message)
    }

    /// The candidate could not be started
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Unavailable, message)
    }

    /// Attach a trace (blank traces are dropped)
    pub fn with_trace(mut self, trace: Option<String>) -> Self {
        self.trace = trace.filter(|t| !t.trim().is_empty());
        self
    }
}

impl fmt::Display for CandidateFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<GraderError> for CandidateFault {
    fn from(err: GraderError) -> Self {
        Self::raised(err.to_string())
    }
}

// ============================================================================
// Strategy
// ============================================================================

/// A submission under evaluation.
///
/// # Contract
///
/// - `capabilities` is called once per submission, before any test case.
/// - `rank_words_by_similarity` is called exactly once per test case with
///   the normalized target and an owned copy of the corpus; the copy may be
///   modified freely.
/// - Everything the candidate may use (embedding, similarity, console) is
///   reached through the [`ExecutionContext`]; each call counts against the
///   context's time budget.
pub trait CandidateStrategy {
    /// Which required functions the submission defines.
    fn capabilities(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<CapabilitySet, CandidateFault>;

    /// Rank `words` by similarity to `target` (1 = most similar).
    fn rank_words_by_similarity(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        target: &str,
        words: Vec<String>,
    ) -> Result<CandidateOutput, CandidateFault>;
}

/// Adapts a closure into a strategy that defines every capability.
pub struct RankFn<F> {
    rank: F,
}

impl<F> RankFn<F>
where
    F: FnMut(&mut ExecutionContext<'_>, &str, Vec<String>) -> Result<CandidateOutput, CandidateFault>,
{
    /// Wrap a ranking closure
    pub fn new(rank: F) -> Self {
        Self { rank }
    }
}

impl<F> CandidateStrategy for RankFn<F>
where
    F: FnMut(&mut ExecutionContext<'_>, &str, Vec<String>) -> Result<CandidateOutput, CandidateFault>,
{
    fn capabilities(
        &mut self,
        _ctx: &mut ExecutionContext<'_>,
    ) -> Result<CapabilitySet, CandidateFault> {
        Ok(CapabilitySet::all())
    }

    fn rank_words_by_similarity(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        target: &str,
        words: Vec<String>,
    ) -> Result<CandidateOutput, CandidateFault> {
        (self.rank)(ctx, target, words)
    }
}
