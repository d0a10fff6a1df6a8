use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::ConvertError;

/// Upper bound on captured stderr kept for error reporting.
const MAX_CAPTURED_STDERR: usize = 4096;

#[derive(Debug)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a single external tool invocation under a deadline.
///
/// The child is spawned with `kill_on_drop` so a timed-out or cancelled run
/// never leaves the process behind; on timeout we additionally issue an
/// explicit kill and reap the child before returning.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run(
        &self,
        tool_name: &str,
        program: &str,
        args: &[impl AsRef<OsStr>],
        cwd: &Path,
    ) -> Result<ToolOutput, ConvertError> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    ConvertError::ToolNotAvailable {
                        tool: tool_name.to_string(),
                    }
                } else {
                    ConvertError::Io(err)
                }
            })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let wait = async {
            let mut stdout_buf = Vec::new();
            let mut stderr_buf = Vec::new();
            let (status, _, _) = tokio::try_join!(
                child.wait(),
                slurp(&mut stdout_pipe, &mut stdout_buf),
                slurp(&mut stderr_pipe, &mut stderr_buf),
            )?;
            Ok::<_, std::io::Error>((status, stdout_buf, stderr_buf))
        };

        let (status, stdout_buf, stderr_buf) =
            match tokio::time::timeout(self.timeout, wait).await {
                Ok(result) => result?,
                Err(_) => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    tracing::warn!(
                        tool = tool_name,
                        timeout_secs = self.timeout.as_secs(),
                        "tool killed after exceeding deadline"
                    );
                    return Err(ConvertError::TimedOut {
                        tool: tool_name.to_string(),
                        timeout: self.timeout,
                    });
                }
            };

        let stdout = String::from_utf8_lossy(&stdout_buf).into_owned();
        let stderr = truncate_lossy(&stderr_buf, MAX_CAPTURED_STDERR);

        if status.success() {
            Ok(ToolOutput {
                exit_code: 0,
                stdout,
                stderr,
            })
        } else {
            // pdflatex and friends report errors on stdout; fall back to its
            // tail when stderr is empty.
            let detail = if stderr.trim().is_empty() {
                tail(&stdout, MAX_CAPTURED_STDERR)
            } else {
                stderr
            };
            tracing::warn!(
                tool = tool_name,
                exit_code = ?status.code(),
                "tool exited unsuccessfully"
            );
            Err(ConvertError::ToolFailed {
                tool: tool_name.to_string(),
                exit_code: status.code(),
                detail,
            })
        }
    }
}

async fn slurp(
    pipe: &mut Option<impl AsyncReadExt + Unpin>,
    buf: &mut Vec<u8>,
) -> std::io::Result<()> {
    if let Some(reader) = pipe {
        reader.read_to_end(buf).await?;
    }
    Ok(())
}

fn truncate_lossy(bytes: &[u8], max: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= max {
        return text.into_owned();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

fn tail(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
