//! Remote execution collaborator: one opaque call, one opaque
//! result-or-failure.
//!
//! The trait keeps the session testable with scripted backends; the real
//! implementation posts to a Piston-compatible endpoint. The failure
//! taxonomy is deliberately coarse: `Transport` when no round-trip
//! completed, `Malformed` when the collaborator answered without a usable
//! result. The session maps each onto its fixed output-panel message.

use async_trait::async_trait;
use core_events::RunOutcome;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed or absent result: {0}")]
    Malformed(String),
}

/// Request payload snapshotted at `begin_run` time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub language: String,
    pub version: String,
    pub source: String,
}

/// Captured output of a completed execution (stdout and stderr combined,
/// as the collaborator reports it). May be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReply {
    pub output: String,
}

#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionReply, ExecError>;
}

/// Map a backend result onto the wire-level outcome carried by the
/// completion event.
pub fn outcome_from_result(result: Result<ExecutionReply, ExecError>) -> RunOutcome {
    match result {
        Ok(reply) => RunOutcome::Completed(reply.output),
        Err(ExecError::Malformed(_)) => RunOutcome::RemoteFailure,
        Err(ExecError::Transport(_)) => RunOutcome::TransportFailure,
    }
}

// -------------------------------------------------------------------------
// Piston backend
// -------------------------------------------------------------------------

/// Default public Piston endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://emkc.org/api/v2/piston/execute";

#[derive(Serialize)]
struct PistonRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<PistonFile<'a>>,
}

#[derive(Serialize)]
struct PistonFile<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct PistonResponse {
    run: Option<PistonRun>,
}

#[derive(Deserialize)]
struct PistonRun {
    #[serde(default)]
    output: String,
}

/// HTTP client for a Piston-compatible execution service.
#[derive(Debug, Clone)]
pub struct PistonBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl PistonBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ExecutionBackend for PistonBackend {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionReply, ExecError> {
        let payload = PistonRequest {
            language: &request.language,
            version: &request.version,
            files: vec![PistonFile {
                content: &request.source,
            }],
        };

        debug!(
            target: "exec",
            endpoint = %self.endpoint,
            language = %request.language,
            version = %request.version,
            source_bytes = request.source.len(),
            "execute_request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExecError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExecError::Malformed(format!("http status {status}")));
        }

        let body: PistonResponse = response
            .json()
            .await
            .map_err(|e| ExecError::Malformed(e.to_string()))?;

        let run = body
            .run
            .ok_or_else(|| ExecError::Malformed("response carried no run result".to_string()))?;

        Ok(ExecutionReply { output: run.output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn outcome_mapping_covers_taxonomy() {
        assert_eq!(
            outcome_from_result(Ok(ExecutionReply {
                output: "42\n".to_string()
            })),
            RunOutcome::Completed("42\n".to_string())
        );
        assert_eq!(
            outcome_from_result(Err(ExecError::Malformed("no run".to_string()))),
            RunOutcome::RemoteFailure
        );
        assert_eq!(
            outcome_from_result(Err(ExecError::Transport("refused".to_string()))),
            RunOutcome::TransportFailure
        );
    }

    #[test]
    fn piston_response_tolerates_missing_fields() {
        let full: PistonResponse =
            serde_json::from_str(r#"{"run": {"output": "hi\n", "code": 0}}"#).unwrap();
        assert_eq!(full.run.unwrap().output, "hi\n");

        let absent: PistonResponse = serde_json::from_str(r#"{"message": "bad"}"#).unwrap();
        assert!(absent.run.is_none());

        let empty_run: PistonResponse = serde_json::from_str(r#"{"run": {}}"#).unwrap();
        assert_eq!(empty_run.run.unwrap().output, "");
    }

    #[test]
    fn piston_request_shape_matches_wire_format() {
        let req = PistonRequest {
            language: "python",
            version: "3.10.0",
            files: vec![PistonFile {
                content: "print(1)",
            }],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["language"], "python");
        assert_eq!(json["version"], "3.10.0");
        assert_eq!(json["files"][0]["content"], "print(1)");
    }

    /// Scripted backend used by session and integration tests.
    pub struct CountingBackend {
        calls: AtomicUsize,
        reply: Result<String, &'static str>,
    }

    impl CountingBackend {
        pub fn succeeding(output: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply: Ok(output.to_string()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExecutionBackend for CountingBackend {
        async fn execute(
            &self,
            _request: &ExecutionRequest,
        ) -> Result<ExecutionReply, ExecError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(out) => Ok(ExecutionReply {
                    output: out.clone(),
                }),
                Err(msg) => Err(ExecError::Transport((*msg).to_string())),
            }
        }
    }

    #[tokio::test]
    async fn rapid_double_trigger_reaches_backend_once() {
        use crate::{Baseline, ExecutionSession, LanguageTarget};

        let backend = CountingBackend::succeeding("ok\n");
        let mut session = ExecutionSession::new(
            Baseline {
                code: "print('ok')".to_string(),
                expected_output: "ok".to_string(),
            },
            LanguageTarget {
                language: "python".to_string(),
                version: "3.10.0".to_string(),
            },
        );

        // Two rapid run triggers: only the first claims a ticket, so the
        // collaborator is called exactly once.
        let tickets: Vec<_> = [session.begin_run("print('ok')"), session.begin_run("print('ok')")]
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(tickets.len(), 1);

        for ticket in tickets {
            let result = backend.execute(&ticket.request).await;
            let completion = core_events::ExecCompletion {
                ticket: ticket.id,
                outcome: outcome_from_result(result),
            };
            session.complete_run(completion);
        }

        assert_eq!(backend.calls(), 1);
        assert_eq!(session.output(), "ok\n");
    }
}
