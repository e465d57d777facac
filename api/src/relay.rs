//! Forwards a question to an external program over stdin and reads the
//! answer from its stdout.

use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, warn};

/// Why the backing process produced no answer.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to collect process output: {0}")]
    Io(#[from] std::io::Error),

    #[error("process exited with {status}")]
    Exit { status: String },

    #[error("process did not finish within {0:?}")]
    Timeout(Duration),
}

/// Spawns one process per question.
#[derive(Clone, Debug)]
pub struct ProcessRelay {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessRelay {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Writes `question` plus a newline to the process stdin, closes it, and
    /// returns the trimmed stdout of a successful exit.
    ///
    /// The process is killed if it outlives the relay timeout.
    ///
    /// # Errors
    /// Any spawn failure, non-zero exit or timeout.
    pub async fn ask(&self, question: &str) -> Result<String, RelayError> {
        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RelayError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Stdin is fed from its own task so a child that fills its stdout pipe
        // before reading all input cannot deadlock the exchange.
        let writer = child.stdin.take().map(|mut stdin| {
            let line = format!("{question}\n");
            tokio::spawn(async move {
                // A program that ignores stdin may already have exited.
                if let Err(e) = stdin.write_all(line.as_bytes()).await {
                    warn!(error = %e, "could not write question to process stdin");
                }
            })
        });

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(res) => res?,
            Err(_) => {
                if let Some(writer) = writer {
                    writer.abort();
                }
                return Err(RelayError::Timeout(self.timeout));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            error!(program = %self.program, "stderr: {line}");
        }

        if !output.status.success() {
            return Err(RelayError::Exit {
                status: output.status.to_string(),
            });
        }

        let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(
            program = %self.program,
            answer_len = answer.len(),
            latency_ms = started.elapsed().as_millis(),
            "relay answered"
        );
        Ok(answer)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_stdout_trimmed() {
        let relay = ProcessRelay::new("cat", vec![], Duration::from_secs(5));
        let answer = relay.ask("  What is my dog's name?").await.unwrap();
        assert_eq!(answer, "What is my dog's name?");
    }

    #[tokio::test]
    async fn non_zero_exit_is_error() {
        let relay = ProcessRelay::new("false", vec![], Duration::from_secs(5));
        assert!(matches!(
            relay.ask("anything").await,
            Err(RelayError::Exit { .. })
        ));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let relay = ProcessRelay::new("definitely-not-a-program-xyz", vec![], Duration::from_secs(5));
        assert!(matches!(
            relay.ask("anything").await,
            Err(RelayError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn question_larger_than_pipe_buffer_round_trips() {
        let relay = ProcessRelay::new("cat", vec![], Duration::from_secs(10));
        let question = "x".repeat(1 << 20);
        let answer = relay.ask(&question).await.unwrap();
        assert_eq!(answer.len(), question.len());
    }

    #[tokio::test]
    async fn stalled_exchange_with_large_input_times_out() {
        // `sleep` never reads stdin, so the pipe fills and the writer blocks.
        let relay = ProcessRelay::new("sleep", vec!["5".into()], Duration::from_millis(200));
        let question = "x".repeat(1 << 20);
        assert!(matches!(
            relay.ask(&question).await,
            Err(RelayError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn slow_program_times_out() {
        let relay = ProcessRelay::new("sleep", vec!["5".into()], Duration::from_millis(100));
        assert!(matches!(
            relay.ask("anything").await,
            Err(RelayError::Timeout(_))
        ));
    }
}
