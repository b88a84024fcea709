use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} timed out after {seconds}s")]
    Timeout { program: String, seconds: u64 },
}

/// Run a command to completion and capture its output. Without a timeout
/// the call waits as long as the tool runs. On timeout the child is killed.
pub async fn run_tool(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<ToolOutput, ToolError> {
    debug!(program, ?args, "Running external tool");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.output();
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, child)
            .await
            .map_err(|_| ToolError::Timeout {
                program: program.to_string(),
                seconds: limit.as_secs(),
            })?,
        None => child.await,
    }
    .map_err(|source| ToolError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: if stderr.is_empty() {
                stdout.trim().to_string()
            } else {
                stderr
            },
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let output = run_tool("sh", &sh("echo hello"), None).await.unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let err = run_tool("sh", &sh("echo broken >&2; exit 3"), None)
            .await
            .unwrap_err();
        match err {
            ToolError::Failed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let err = run_tool("sh", &sh("sleep 5"), Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run_tool("genevision-no-such-tool", &[], None).await.unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
