//! Out-of-process sandbox for untrusted submissions.
//!
//! The submission source is written to a private temporary directory. By
//! default the bundled Python runner is staged next to it; the runner
//! loads the submission, hands it the grader's helpers and answers the
//! [`protocol`](super::protocol) for it. Every capability check and every
//! test case gets a fresh child process with:
//!
//! - the confinement and resource limits from [`sandbox`](super::sandbox),
//! - a cleared environment (only `PATH` is passed through),
//! - the temporary directory as its working directory,
//! - piped stdin/stdout/stderr speaking the protocol,
//! - a hard wall-clock deadline taken from the [`ExecutionContext`].
//!
//! A child never outlives the call that spawned it: [`Session`] kills its
//! whole process group and reaps it on every exit path, including
//! unwinding.

use super::context::ExecutionContext;
use super::protocol::{CandidateMessage, HostMessage};
use super::sandbox;
use super::traits::{CandidateFault, CandidateOutput, CandidateStrategy, CapabilitySet, FaultKind};
use crate::errors::{GraderError, Result};
use crate::types::{SandboxConfig, SubmissionRunner};
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use wait_timeout::ChildExt;

/// The Python runner staged for [`SubmissionRunner::Python`].
pub const PYTHON_RUNNER: &str = include_str!("runner.py");

/// Longest stdout line read in one piece.
const MAX_LINE_BYTES: u64 = 8 * 1024 * 1024;
/// Stderr kept for traces.
const MAX_TRACE_BYTES: u64 = 64 * 1024;
/// How long a finished child may take to close its output before its
/// process group is killed.
const EXIT_GRACE: Duration = Duration::from_millis(200);
/// How long to wait for the stderr reader after the group is killed.
const STDERR_GRACE: Duration = Duration::from_millis(200);
/// How long a killed child may take to be reaped.
const REAP_GRACE: Duration = Duration::from_secs(2);

/// A submission run by an external interpreter.
#[derive(Debug)]
pub struct ProcessCandidate {
    sandbox: SandboxConfig,
    argv: Vec<OsString>,
    source: NamedTempFile,
    workdir: TempDir,
}

impl ProcessCandidate {
    /// Stage `source` for execution under `sandbox`.
    pub fn new(source: &str, sandbox: &SandboxConfig) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(GraderError::empty_input("submission source is empty"));
        }
        if sandbox.interpreter.is_empty() {
            return Err(GraderError::invalid_config(
                "sandbox.interpreter must name a program",
            ));
        }

        let workdir = tempfile::Builder::new().prefix("rank-grader-").tempdir()?;
        let mut file = tempfile::Builder::new()
            .prefix("submission-")
            .tempfile_in(workdir.path())?;
        file.write_all(source.as_bytes())?;
        file.flush()?;

        let mut argv: Vec<OsString> = sandbox.interpreter.iter().map(OsString::from).collect();
        if sandbox.runner == SubmissionRunner::Python {
            let runner = workdir.path().join("runner.py");
            std::fs::write(&runner, PYTHON_RUNNER)?;
            argv.push(runner.into_os_string());
        }
        argv.push(file.path().as_os_str().to_owned());

        Ok(Self {
            sandbox: sandbox.clone(),
            argv,
            source: file,
            workdir,
        })
    }

    /// Where the staged source lives (inside the private working directory)
    pub fn source_path(&self) -> &Path {
        self.source.path()
    }

    /// The private working directory
    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    fn spawn(&self) -> std::result::Result<Session, CandidateFault> {
        let mut cmd = sandbox::command(&self.sandbox, self.workdir.path(), &self.argv);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| {
            CandidateFault::unavailable(format!(
                "cannot start '{}': {}",
                cmd.get_program().to_string_lossy(),
                e
            ))
        })?;
        Session::start(child)
    }
}

impl CandidateStrategy for ProcessCandidate {
    fn capabilities(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
    ) -> std::result::Result<CapabilitySet, CandidateFault> {
        let mut session = self.spawn()?;
        let result = session.serve_describe(ctx);
        session.finish(result)
    }

    fn rank_words_by_similarity(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        target: &str,
        words: Vec<String>,
    ) -> std::result::Result<CandidateOutput, CandidateFault> {
        let mut session = self.spawn()?;
        let result = session.serve_rank(ctx, target, words);
        session.finish(result)
    }
}

// ============================================================================
// Session: one child process
// ============================================================================

struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
    stderr: Receiver<String>,
    reaped: bool,
}

impl Session {
    fn start(mut child: Child) -> std::result::Result<Self, CandidateFault> {
        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            sandbox::kill_tree(&mut child);
            let _ = child.wait();
            return Err(CandidateFault::unavailable(
                "candidate stdio could not be captured",
            ));
        };

        let (line_tx, lines) = mpsc::channel();
        thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut bytes = Vec::new();
            loop {
                bytes.clear();
                match (&mut reader).take(MAX_LINE_BYTES).read_until(b'\n', &mut bytes) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&bytes);
                        let line = line.trim_end_matches(['\r', '\n']).to_string();
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let (err_tx, stderr_rx) = mpsc::channel();
        thread::spawn(move || {
            let mut stderr = stderr;
            let mut bytes = Vec::new();
            let _ = (&mut stderr).take(MAX_TRACE_BYTES).read_to_end(&mut bytes);
            // Keep draining so a chatty child never blocks on a full pipe.
            let _ = io::copy(&mut stderr, &mut io::sink());
            let _ = err_tx.send(String::from_utf8_lossy(&bytes).into_owned());
        });

        Ok(Self {
            child,
            stdin: Some(stdin),
            lines,
            stderr: stderr_rx,
            reaped: false,
        })
    }

    fn send(&mut self, message: &HostMessage) -> std::result::Result<(), CandidateFault> {
        let line = message
            .to_line()
            .map_err(|e| CandidateFault::protocol(format!("cannot encode message: {}", e)))?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CandidateFault::crashed("candidate input is closed"))?;
        stdin
            .write_all(line.as_bytes())
            .and_then(|_| stdin.flush())
            .map_err(|e| CandidateFault::crashed(format!("candidate stopped reading: {}", e)))
    }

    /// Next protocol message. Console lines are forwarded to the context on
    /// the way; `Ok(None)` means the child closed its stdout.
    fn next_message(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
    ) -> std::result::Result<Option<CandidateMessage>, CandidateFault> {
        loop {
            ctx.check_budget()?;
            let received = match ctx.remaining() {
                Some(remaining) => self.lines.recv_timeout(remaining),
                None => self
                    .lines
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(line) => match CandidateMessage::parse_line(&line) {
                    Some(CandidateMessage::Print { text }) => ctx.print(&text),
                    Some(message) => return Ok(Some(message)),
                    None => ctx.print(&line),
                },
                Err(RecvTimeoutError::Timeout) => {
                    return Err(CandidateFault::timed_out(ctx.budget().unwrap_or_default()))
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }

    fn serve_describe(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
    ) -> std::result::Result<CapabilitySet, CandidateFault> {
        self.send(&HostMessage::Describe)?;
        match self.next_message(ctx)? {
            Some(CandidateMessage::Capabilities { names }) => Ok(CapabilitySet::from_names(names)),
            Some(CandidateMessage::Error { message, trace }) => {
                Err(CandidateFault::raised(message).with_trace(trace))
            }
            Some(other) => Err(CandidateFault::protocol(format!(
                "expected a capabilities message, got {}",
                message_type(&other)
            ))),
            None => Err(CandidateFault::crashed(
                "candidate exited before reporting its capabilities",
            )),
        }
    }

    fn serve_rank(
        &mut self,
        ctx: &mut ExecutionContext<'_>,
        target: &str,
        words: Vec<String>,
    ) -> std::result::Result<CandidateOutput, CandidateFault> {
        self.send(&HostMessage::Rank {
            target: target.to_string(),
            words,
        })?;

        loop {
            let Some(message) = self.next_message(ctx)? else {
                return Err(CandidateFault::crashed(
                    "candidate exited without returning a ranking",
                ));
            };

            match message {
                CandidateMessage::Embed { word } => {
                    let reply = match ctx.compute_embedding(&word) {
                        Ok(vector) => HostMessage::Vector { vector },
                        Err(fault) if fault.kind == FaultKind::TimedOut => return Err(fault),
                        Err(fault) => HostMessage::Failure {
                            message: fault.message,
                        },
                    };
                    self.send(&reply)?;
                }
                CandidateMessage::Similarity { a, b } => {
                    let value = ctx.cosine_similarity(&a, &b)?;
                    self.send(&HostMessage::Score { value })?;
                }
                CandidateMessage::Print { text } => ctx.print(&text),
                CandidateMessage::Ranking { ranking } => {
                    return Ok(CandidateOutput::from_json(ranking))
                }
                CandidateMessage::Error { message, trace } => {
                    return Err(CandidateFault::raised(message).with_trace(trace))
                }
                CandidateMessage::Capabilities { .. } => {
                    return Err(CandidateFault::protocol(
                        "unexpected capabilities message while ranking",
                    ))
                }
            }
        }
    }

    /// Reap the child and, on failure, attach its stderr as the trace.
    fn finish<T>(
        mut self,
        result: std::result::Result<T, CandidateFault>,
    ) -> std::result::Result<T, CandidateFault> {
        match result {
            Ok(value) => {
                self.reap(true);
                Ok(value)
            }
            Err(fault) => {
                let graceful = fault.kind != FaultKind::TimedOut;
                if !graceful {
                    trace_event!(warn, error = %fault, "killing candidate process");
                }
                let stderr = self.reap(graceful);
                if fault.trace.is_some() {
                    Err(fault)
                } else {
                    Err(fault.with_trace(stderr))
                }
            }
        }
    }

    /// Close stdin, give the child a moment to finish (when `graceful`),
    /// then kill its process group and collect stderr.
    ///
    /// The group is killed before the leader is reaped, so the group id
    /// still names the candidate's processes.
    fn reap(&mut self, graceful: bool) -> Option<String> {
        drop(self.stdin.take());

        // stderr reaches EOF once every process holding it has exited.
        let trace = if graceful {
            self.stderr.recv_timeout(EXIT_GRACE).ok()
        } else {
            None
        };
        self.kill();
        trace.or_else(|| self.stderr.recv_timeout(STDERR_GRACE).ok())
    }

    fn kill(&mut self) {
        sandbox::kill_tree(&mut self.child);
        if !matches!(self.child.wait_timeout(REAP_GRACE), Ok(Some(_))) {
            trace_event!(
                warn,
                pid = self.child.id(),
                "candidate process did not exit after SIGKILL"
            );
        }
        self.reaped = true;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.reaped {
            self.kill();
        }
    }
}

fn message_type(message: &CandidateMessage) -> &'static str {
    match message {
        CandidateMessage::Capabilities { .. } => "capabilities",
        CandidateMessage::Embed { .. } => "embed",
        CandidateMessage::Similarity { .. } => "similarity",
        CandidateMessage::Print { .. } => "print",
        CandidateMessage::Ranking { .. } => "ranking",
        CandidateMessage::Error { .. } => "error",
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::candidate::context::Console;
    use crate::candidate::traits::Capability;
    use crate::types::Isolation;
    use crate::vector::VectorSpace;
    use std::time::Instant;

    fn shell_sandbox() -> SandboxConfig {
        SandboxConfig {
            interpreter: vec!["sh".to_string()],
            ..SandboxConfig::default()
        }
        .with_runner(SubmissionRunner::Direct)
        .with_isolation(Isolation::Unconfined)
    }

    fn shell_candidate(script: &str) -> ProcessCandidate {
        ProcessCandidate::new(script, &shell_sandbox()).unwrap()
    }

    const WELL_BEHAVED: &str = r#"
read request
case "$request" in
  *describe*)
    echo '{"type":"capabilities","names":["compute_embedding","rank_words_by_similarity"]}'
    ;;
  *)
    echo "thinking about it"
    echo '{"type":"print","text":"almost done"}'
    echo '{"type":"ranking","ranking":{"cat":1,"dog":2}}'
    ;;
esac
"#;

    #[test]
    fn test_empty_source_is_rejected() {
        let result = ProcessCandidate::new("   \n", &SandboxConfig::default());
        assert!(matches!(result, Err(GraderError::EmptyInput { .. })));
    }

    #[test]
    fn test_source_is_staged_in_private_dir() {
        let candidate = shell_candidate("echo hi");
        let staged = std::fs::read_to_string(candidate.source_path()).unwrap();
        assert_eq!(staged, "echo hi");
    }

    #[test]
    fn test_python_runner_is_staged() {
        let candidate = ProcessCandidate::new("x = 1\n", &SandboxConfig::default()).unwrap();
        let runner = std::fs::read_to_string(candidate.workdir().join("runner.py")).unwrap();
        assert_eq!(runner, PYTHON_RUNNER);
        assert!(candidate.source_path().starts_with(candidate.workdir()));

        let direct = shell_candidate("echo hi");
        assert!(!direct.workdir().join("runner.py").exists());
    }

    #[test]
    fn test_describe() {
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx = ExecutionContext::new(&space, &mut console).with_budget(Duration::from_secs(10));
        let mut candidate = shell_candidate(WELL_BEHAVED);

        let caps = candidate.capabilities(&mut ctx).unwrap();
        assert_eq!(caps, CapabilitySet::all());
        assert!(caps.contains(Capability::RankWordsBySimilarity));
    }

    #[test]
    fn test_rank_captures_console_output() {
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx = ExecutionContext::new(&space, &mut console).with_budget(Duration::from_secs(10));
        let mut candidate = shell_candidate(WELL_BEHAVED);

        let output = candidate
            .rank_words_by_similarity(&mut ctx, "cat", vec!["cat".into(), "dog".into()])
            .unwrap();
        let CandidateOutput::Ranking(ranking) = output else {
            panic!("expected a ranking");
        };
        assert_eq!(ranking.get("cat"), Some(1));
        assert_eq!(console.contents(), "thinking about it\nalmost done\n");
    }

    #[test]
    fn test_embed_round_trip() {
        let script = r#"
read request
echo '{"type":"embed","word":"cat"}'
read reply
case "$reply" in
  *sparse*) echo '{"type":"ranking","ranking":{"ok":1}}' ;;
  *) echo '{"type":"error","message":"no vector"}' ;;
esac
"#;
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx = ExecutionContext::new(&space, &mut console).with_budget(Duration::from_secs(10));
        let mut candidate = shell_candidate(script);

        let output = candidate
            .rank_words_by_similarity(&mut ctx, "cat", vec!["cat".into()])
            .unwrap();
        assert!(matches!(output, CandidateOutput::Ranking(_)));
        assert_eq!(ctx.embedding_calls(), 1);
    }

    #[test]
    fn test_candidate_error_is_raised() {
        let script = r#"
read request
echo '{"type":"error","message":"ZeroDivisionError: division by zero","trace":"line 7"}'
"#;
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx = ExecutionContext::new(&space, &mut console).with_budget(Duration::from_secs(10));
        let mut candidate = shell_candidate(script);

        let fault = candidate
            .rank_words_by_similarity(&mut ctx, "cat", vec![])
            .unwrap_err();
        assert_eq!(fault.kind, FaultKind::Raised);
        assert!(fault.message.contains("ZeroDivisionError"));
        assert_eq!(fault.trace.as_deref(), Some("line 7"));
    }

    #[test]
    fn test_crash_keeps_stderr_as_trace() {
        let script = "echo 'boom: undefined name' >&2\nexit 3\n";
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx = ExecutionContext::new(&space, &mut console).with_budget(Duration::from_secs(10));
        let mut candidate = shell_candidate(script);

        let fault = candidate
            .rank_words_by_similarity(&mut ctx, "cat", vec![])
            .unwrap_err();
        assert_eq!(fault.kind, FaultKind::Crashed);
        assert!(fault.trace.unwrap_or_default().contains("boom"));
    }

    #[test]
    fn test_time_budget_kills_child() {
        let script = "read request\nexec sleep 30\n";
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx =
            ExecutionContext::new(&space, &mut console).with_budget(Duration::from_millis(300));
        let mut candidate = shell_candidate(script);

        let started = Instant::now();
        let fault = candidate
            .rank_words_by_similarity(&mut ctx, "cat", vec![])
            .unwrap_err();
        assert_eq!(fault.kind, FaultKind::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_time_budget_kills_forked_processes() {
        let outside = tempfile::tempdir().unwrap();
        let marker = outside.path().join("marker");
        let script = format!(
            "read request\n( sleep 1; echo alive > '{}' ) &\nexec sleep 30\n",
            marker.display()
        );
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx =
            ExecutionContext::new(&space, &mut console).with_budget(Duration::from_millis(300));
        let mut candidate = shell_candidate(&script);

        let fault = candidate
            .rank_words_by_similarity(&mut ctx, "cat", vec![])
            .unwrap_err();
        assert_eq!(fault.kind, FaultKind::TimedOut);

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[test]
    fn test_finished_candidate_leaves_no_background_processes() {
        let outside = tempfile::tempdir().unwrap();
        let marker = outside.path().join("marker");
        let script = format!(
            "read request\n( sleep 1; echo alive > '{}' ) &\necho '{{\"type\":\"ranking\",\"ranking\":{{\"cat\":1}}}}'\n",
            marker.display()
        );
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx = ExecutionContext::new(&space, &mut console).with_budget(Duration::from_secs(10));
        let mut candidate = shell_candidate(&script);

        let output = candidate
            .rank_words_by_similarity(&mut ctx, "cat", vec!["cat".into()])
            .unwrap();
        assert!(matches!(output, CandidateOutput::Ranking(_)));

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_cpu_limit_follows_time_budget() {
        let script = "read request\nulimit -t\necho '{\"type\":\"capabilities\",\"names\":[]}'\n";
        let sandbox = SandboxConfig {
            time_budget_ms: 2_000,
            ..shell_sandbox()
        };
        let mut candidate = ProcessCandidate::new(script, &sandbox).unwrap();
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx = ExecutionContext::new(&space, &mut console).with_budget(Duration::from_secs(10));

        assert_eq!(candidate.capabilities(&mut ctx).unwrap(), CapabilitySet::empty());
        assert_eq!(console.contents(), "3\n");
    }

    #[cfg(target_os = "linux")]
    fn bubblewrap_works() -> bool {
        std::process::Command::new("bwrap")
            .args(["--ro-bind", "/", "/", "true"])
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_bubblewrap_hides_host_files() {
        if !bubblewrap_works() {
            return;
        }
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret");
        std::fs::write(&secret, "hidden").unwrap();
        let script = format!(
            r#"read request
if [ -e '{}' ]; then
  echo '{{"type":"capabilities","names":[]}}'
else
  echo '{{"type":"capabilities","names":["compute_embedding","rank_words_by_similarity"]}}'
fi
"#,
            secret.display()
        );
        let sandbox = shell_sandbox().with_isolation(Isolation::Bubblewrap);
        let mut candidate = ProcessCandidate::new(&script, &sandbox).unwrap();
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx = ExecutionContext::new(&space, &mut console).with_budget(Duration::from_secs(10));

        assert_eq!(candidate.capabilities(&mut ctx).unwrap(), CapabilitySet::all());
    }

    #[test]
    fn test_missing_bubblewrap_fails_closed() {
        let sandbox = SandboxConfig {
            bubblewrap: "/definitely/not/bwrap".to_string(),
            ..shell_sandbox().with_isolation(Isolation::Bubblewrap)
        };
        let mut candidate = ProcessCandidate::new("anything", &sandbox).unwrap();
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx = ExecutionContext::new(&space, &mut console);

        let fault = candidate.capabilities(&mut ctx).unwrap_err();
        assert_eq!(fault.kind, FaultKind::Unavailable);
        assert!(fault.message.contains("/definitely/not/bwrap"));
    }

    #[test]
    fn test_missing_interpreter_is_unavailable() {
        let sandbox = SandboxConfig {
            interpreter: vec!["/definitely/not/an/interpreter".to_string()],
            ..shell_sandbox()
        };
        let mut candidate = ProcessCandidate::new("anything", &sandbox).unwrap();
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx = ExecutionContext::new(&space, &mut console);

        let fault = candidate.capabilities(&mut ctx).unwrap_err();
        assert_eq!(fault.kind, FaultKind::Unavailable);
    }

    #[test]
    fn test_environment_is_cleared() {
        let script = r#"
read request
if [ -z "$HOME" ]; then
  echo '{"type":"capabilities","names":["compute_embedding","rank_words_by_similarity"]}'
else
  echo '{"type":"capabilities","names":[]}'
fi
"#;
        let space = VectorSpace::sparse();
        let mut console = Console::new(4096);
        let mut ctx = ExecutionContext::new(&space, &mut console).with_budget(Duration::from_secs(10));
        let mut candidate = shell_candidate(script);

        assert_eq!(candidate.capabilities(&mut ctx).unwrap(), CapabilitySet::all());
    }
}
