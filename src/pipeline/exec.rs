//! Shared subprocess driver for the tool adapters.
//!
//! One helper owns the whole spawn/wait/verify sequence so every adapter
//! reports failures identically: a spawn error and a non-zero exit are both
//! [`JobOutcome::ToolFailure`], and an artifact the tool claimed to produce
//! but did not is [`JobOutcome::MissingOutput`]. Stderr is captured and
//! logged rather than inherited — external tools can be chatty, and their
//! diagnostics belong in our logs, not on the process's terminal.

use super::{JobOutcome, OutputArtifact};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run a prepared command and verify it produced `expected_output`.
pub(crate) async fn run_checked(
    tool: &'static str,
    command: &mut Command,
    expected_output: &Path,
) -> JobOutcome {
    debug!("spawning {tool}");

    let output = match command.output().await {
        Ok(output) => output,
        Err(e) => {
            warn!("{tool} could not be spawned: {e}");
            return JobOutcome::ToolFailure { tool, code: None };
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            "{tool} exited with {:?}: {}",
            output.status.code(),
            stderr.trim()
        );
        return JobOutcome::ToolFailure {
            tool,
            code: output.status.code(),
        };
    }

    if !expected_output.exists() {
        warn!(
            "{tool} reported success but {} is absent",
            expected_output.display()
        );
        return JobOutcome::MissingOutput {
            expected: expected_output.to_path_buf(),
        };
    }

    debug!("{tool} produced {}", expected_output.display());
    JobOutcome::Success(OutputArtifact::new(expected_output.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_tool_failure() {
        let mut cmd = Command::new("/nonexistent/binary/for/pdfmate/tests");
        let outcome = run_checked("ghost", &mut cmd, Path::new("/tmp/never.pdf")).await;
        assert!(matches!(
            outcome,
            JobOutcome::ToolFailure {
                tool: "ghost",
                code: None
            }
        ));
    }

    #[tokio::test]
    async fn nonzero_exit_is_tool_failure_with_code() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 3"]);
        let outcome = run_checked("sh", &mut cmd, Path::new("/tmp/never.pdf")).await;
        match outcome {
            JobOutcome::ToolFailure { tool, code } => {
                assert_eq!(tool, "sh");
                assert_eq!(code, Some(3));
            }
            other => panic!("expected ToolFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_exit_without_artifact_is_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("out.pdf");

        let mut cmd = Command::new("true");
        let outcome = run_checked("true", &mut cmd, &expected).await;
        assert!(matches!(outcome, JobOutcome::MissingOutput { .. }));
    }

    #[tokio::test]
    async fn zero_exit_with_artifact_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("out.pdf");

        let mut cmd = Command::new("sh");
        cmd.args(["-c", &format!("echo data > {}", expected.display())]);
        let outcome = run_checked("sh", &mut cmd, &expected).await;
        match outcome {
            JobOutcome::Success(artifact) => assert_eq!(artifact.path(), expected),
            other => panic!("expected Success, got {other:?}"),
        }
    }
}
