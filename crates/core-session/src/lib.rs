//! Execution session: the state machine coordinating edits, remote runs,
//! and resets for one exercise.
//!
//! States are `Idle(stale)` and `Running`. Edits record staleness; a run
//! moves to `Running` and issues exactly one ticketed request; the ticket's
//! completion (delivered back through the event loop) writes exactly one
//! terminal message to the output panel and returns to `Idle(stale=false)`.
//! A completion whose ticket does not match the current session identity
//! and sequence is discarded — that is the whole defense against a slow
//! response landing after the user navigated away.

pub mod backend;

pub use backend::{
    ExecError, ExecutionBackend, ExecutionReply, ExecutionRequest, PistonBackend,
    outcome_from_result,
};

use core_events::{EXEC_RESPONSES_DISCARDED, ExecCompletion, RunOutcome, RunTicketId};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Output panel text when the collaborator returned an empty capture.
pub const NO_OUTPUT_MESSAGE: &str = "No output returned.";
/// Output panel text when the collaborator answered without a usable result.
pub const REMOTE_FAILURE_MESSAGE: &str = "Error: Could not execute on remote server.";
/// Output panel text when the request never completed a network round-trip.
pub const NETWORK_FAILURE_MESSAGE: &str =
    "Error: Network connection failed.\nPlease check your internet connection.";

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one session instance. A fresh session (and
/// therefore a fresh id) is constructed on every exercise switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// An exercise's original source text and recorded output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub code: String,
    pub expected_output: String,
}

/// Target language/version identifier carried by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTarget {
    pub language: String,
    pub version: String,
}

/// A claim on one in-flight run: the ticket identity the completion must
/// present, plus the request payload snapshotted at `begin_run` time.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub id: RunTicketId,
    pub request: ExecutionRequest,
}

/// Whether a completion was applied to the session or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDisposition {
    Applied,
    Discarded,
}

#[derive(Debug)]
pub struct ExecutionSession {
    id: SessionId,
    baseline: Baseline,
    target: LanguageTarget,
    output: String,
    stale: bool,
    running: bool,
    run_seq: u64,
}

impl ExecutionSession {
    /// A fresh session shows the baseline output, unstale, idle.
    pub fn new(baseline: Baseline, target: LanguageTarget) -> Self {
        let output = baseline.expected_output.clone();
        Self {
            id: SessionId::next(),
            baseline,
            target,
            output,
            stale: false,
            running: false,
            run_seq: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Record that the source text changed. The displayed output is now
    /// unconfirmed for the current text; it is not thereby wrong.
    pub fn note_edit(&mut self) {
        self.stale = true;
    }

    /// Claim a run against the given source snapshot. Refused while a run
    /// is already in flight, which makes double submission impossible.
    pub fn begin_run(&mut self, source: &str) -> Option<RunTicket> {
        if self.running {
            return None;
        }
        self.running = true;
        self.run_seq += 1;
        Some(RunTicket {
            id: RunTicketId {
                session: self.id.0,
                seq: self.run_seq,
            },
            request: ExecutionRequest {
                language: self.target.language.clone(),
                version: self.target.version.clone(),
                source: source.to_string(),
            },
        })
    }

    /// Apply a completion if its ticket matches the in-flight run;
    /// otherwise drop it silently (counted, logged at debug).
    pub fn complete_run(&mut self, completion: ExecCompletion) -> CompletionDisposition {
        let expected = RunTicketId {
            session: self.id.0,
            seq: self.run_seq,
        };
        if !self.running || completion.ticket != expected {
            EXEC_RESPONSES_DISCARDED.fetch_add(1, Ordering::Relaxed);
            debug!(
                target: "exec",
                ticket = %completion.ticket,
                expected = %expected,
                "stale_response_discarded"
            );
            return CompletionDisposition::Discarded;
        }

        self.output = match completion.outcome {
            RunOutcome::Completed(text) if text.is_empty() => NO_OUTPUT_MESSAGE.to_string(),
            RunOutcome::Completed(text) => text,
            RunOutcome::RemoteFailure => REMOTE_FAILURE_MESSAGE.to_string(),
            RunOutcome::TransportFailure => NETWORK_FAILURE_MESSAGE.to_string(),
        };
        self.running = false;
        self.stale = false;
        CompletionDisposition::Applied
    }

    /// Restore the baseline output and report the baseline so the caller
    /// rewrites the surface text. Refused while a run is in flight.
    pub fn reset(&mut self) -> Option<&Baseline> {
        if self.running {
            return None;
        }
        self.output = self.baseline.expected_output.clone();
        self.stale = false;
        Some(&self.baseline)
    }
}
