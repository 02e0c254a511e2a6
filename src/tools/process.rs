// src/tools/process.rs

//! Running external tools as child processes.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ToolCommand;
use crate::errors::{BuildError, Result};

/// One invocation of a [`ToolCommand`].
#[derive(Debug, Default)]
pub struct ToolInvocation<'a> {
    /// Arguments appended after the configured ones.
    pub args: Vec<String>,
    /// Written to the child's stdin, which is then closed.
    pub stdin: Option<String>,
    pub cwd: Option<&'a Path>,
    pub env: Vec<(String, String)>,
}

/// Spawn the tool, feed stdin, and return its stdout.
///
/// - stderr is captured; it is logged at debug level and, on failure,
///   carried in [`BuildError::ToolFailed`].
/// - The child is killed if the returned future is dropped (e.g. on
///   cancellation).
pub async fn run_tool(tool: &ToolCommand, invocation: ToolInvocation<'_>) -> Result<String> {
    info!(
        program = %tool.program,
        args = ?invocation.args,
        "starting tool process"
    );

    let mut cmd = Command::new(&tool.program);
    cmd.args(&tool.args)
        .args(&invocation.args)
        .stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = invocation.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &invocation.env {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn().map_err(|e| BuildError::ToolFailed {
        tool: tool.program.clone(),
        code: None,
        stderr: format!("failed to spawn: {e}"),
    })?;

    // Feed stdin from a separate task so a chatty child can't deadlock us on
    // a full stdout pipe.
    if let (Some(input), Some(mut stdin)) = (invocation.stdin, child.stdin.take()) {
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                debug!(error = %e, "tool closed stdin early");
            }
        });
    }

    let mut stderr_pipe = child.stderr.take();
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(stderr) = stderr_pipe.as_mut() {
            let _ = stderr.read_to_string(&mut buf).await;
        }
        buf
    });

    let mut stdout = String::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_string(&mut stdout).await?;
    }

    let status = child.wait().await?;
    let stderr = stderr_task.await.unwrap_or_default();
    for line in stderr.lines() {
        debug!(program = %tool.program, "stderr: {}", line);
    }

    info!(
        program = %tool.program,
        exit_code = status.code().unwrap_or(-1),
        success = status.success(),
        "tool process exited"
    );

    if status.success() {
        Ok(stdout)
    } else {
        Err(BuildError::ToolFailed {
            tool: tool.program.clone(),
            code: status.code(),
            stderr: stderr.trim().to_string(),
        })
    }
}
