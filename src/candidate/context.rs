//! The restricted execution context handed to candidate code.
//!
//! A candidate sees exactly: the embedding function, the similarity
//! function, a character-frequency counter, and a console. There is no
//! handle to the filesystem, the network, or the process.
//!
//! Candidate output never touches the grader's own stdout. Each submission
//! owns a [`Console`] buffer and the context writes into it, so there is no
//! global stream to divert or restore.

use super::traits::CandidateFault;
use crate::vector::{VectorKind, VectorRepresentation, VectorSpace};
use std::time::{Duration, Instant};

const TRUNCATION_NOTICE: &str = "\n[console output truncated]\n";

// ============================================================================
// Console
// ============================================================================

/// Bounded buffer capturing a submission's console output.
#[derive(Debug, Clone)]
pub struct Console {
    buffer: String,
    limit: usize,
    truncated: bool,
}

impl Console {
    /// A console that keeps at most `limit` bytes
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: String::new(),
            limit,
            truncated: false,
        }
    }

    /// Append text verbatim
    pub fn write(&mut self, text: &str) {
        if self.truncated {
            return;
        }
        let room = self.limit.saturating_sub(self.buffer.len());
        if text.len() <= room {
            self.buffer.push_str(text);
            return;
        }

        let mut cut = room;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        self.buffer.push_str(&text[..cut]);
        self.truncated = true;
    }

    /// Append text followed by a newline
    pub fn write_line(&mut self, text: &str) {
        self.write(text);
        self.write("\n");
    }

    /// Captured output so far
    pub fn contents(&self) -> &str {
        &self.buffer
    }

    /// Whether output was dropped because the limit was reached
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Consume the console, returning everything captured
    pub fn into_string(mut self) -> String {
        if self.truncated {
            self.buffer.push_str(TRUNCATION_NOTICE);
        }
        self.buffer
    }
}

// ============================================================================
// Execution context
// ============================================================================

/// Capabilities available to one candidate invocation.
///
/// Every capability call checks the time budget first, so a strategy that
/// keeps asking for embeddings after its deadline gets a
/// [`FaultKind::TimedOut`](super::traits::FaultKind::TimedOut) fault instead
/// of an answer.
#[derive(Debug)]
pub struct ExecutionContext<'a> {
    space: &'a VectorSpace,
    console: &'a mut Console,
    started: Instant,
    budget: Option<Duration>,
    embedding_calls: usize,
    similarity_calls: usize,
}

impl<'a> ExecutionContext<'a> {
    /// A context without a time budget
    pub fn new(space: &'a VectorSpace, console: &'a mut Console) -> Self {
        Self {
            space,
            console,
            started: Instant::now(),
            budget: None,
            embedding_calls: 0,
            similarity_calls: 0,
        }
    }

    /// Builder method: limit wall-clock time from now
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.started = Instant::now();
        self.budget = Some(budget);
        self
    }

    /// Embed a word using the grader's vector space.
    pub fn compute_embedding(&mut self, word: &str) -> Result<VectorRepresentation, CandidateFault> {
        self.check_budget()?;
        self.embedding_calls += 1;
        Ok(self.space.compute_embedding(word)?)
    }

    /// Cosine similarity of two vectors of any kind.
    pub fn cosine_similarity(
        &mut self,
        a: &VectorRepresentation,
        b: &VectorRepresentation,
    ) -> Result<f64, CandidateFault> {
        self.check_budget()?;
        self.similarity_calls += 1;
        Ok(self.space.cosine_similarity(a, b))
    }

    /// Character-frequency vector of a word (a counting utility; does not
    /// consult the embedding provider).
    pub fn char_frequencies(&self, word: &str) -> VectorRepresentation {
        VectorRepresentation::Sparse(VectorSpace::compute_char_vector(word))
    }

    /// The representation `compute_embedding` returns
    pub fn mode(&self) -> VectorKind {
        self.space.mode()
    }

    /// Write a line to the submission's console
    pub fn print(&mut self, text: &str) {
        self.console.write_line(text);
    }

    /// Fail if the budget has run out.
    pub fn check_budget(&self) -> Result<(), CandidateFault> {
        match self.budget {
            Some(budget) if self.started.elapsed() > budget => {
                Err(CandidateFault::timed_out(budget))
            }
            _ => Ok(()),
        }
    }

    /// Time left before the deadline (`None` when unbounded)
    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .map(|budget| budget.saturating_sub(self.started.elapsed()))
    }

    /// The configured budget
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Time since the context was created (or the budget was set)
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Number of `compute_embedding` calls made so far
    pub fn embedding_calls(&self) -> usize {
        self.embedding_calls
    }

    /// Number of `cosine_similarity` calls made so far
    pub fn similarity_calls(&self) -> usize {
        self.similarity_calls
    }
}
