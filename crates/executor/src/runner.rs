//! External command execution on tokio child processes.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use validation::{CommandError, CommandRunner, ExecutionContext};

/// Maximum number of trailing stderr bytes kept in [`CommandError::NonZeroExit`].
pub const STDERR_TAIL_BYTES: usize = 2048;

/// Maximum number of trailing stdout bytes kept for the debug log.
pub const STDOUT_TAIL_BYTES: usize = 2048;

const READ_CHUNK_BYTES: usize = 8192;

/// [`CommandRunner`] that spawns the program as a child process.
///
/// The child is spawned with `kill_on_drop`, so it is killed whenever the
/// wait is abandoned: context cancellation, timeout, or the request future
/// itself being dropped. Both output streams are drained while the child
/// runs but only their tails are kept in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCommandRunner;

impl ProcessCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, ctx: &ExecutionContext, args: &[String]) -> Result<(), CommandError> {
        let (program, rest) = args.split_first().ok_or(CommandError::EmptyCommand)?;
        if ctx.is_cancelled() {
            return Err(CommandError::Cancelled);
        }

        let start = Instant::now();
        tracing::info!(program = %program, args = ?rest, "running command");

        let mut child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let completion = async {
            let (status, stdout, stderr) = tokio::join!(
                child.wait(),
                read_tail(stdout, STDOUT_TAIL_BYTES),
                read_tail(stderr, STDERR_TAIL_BYTES),
            );
            Ok::<_, std::io::Error>((status?, stdout?, stderr?))
        };

        let deadline = async {
            match ctx.timeout() {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };

        let (status, stdout, stderr) = tokio::select! {
            output = completion => output.map_err(|source| CommandError::Wait {
                program: program.clone(),
                source,
            })?,
            () = ctx.cancelled() => {
                tracing::warn!(program = %program, "command cancelled, killing process");
                return Err(CommandError::Cancelled);
            }
            () = deadline => {
                let timeout = ctx.timeout().unwrap_or_default();
                tracing::warn!(program = %program, timeout_secs = timeout.as_secs(), "command timed out, killing process");
                return Err(CommandError::TimedOut { timeout });
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = status.code().unwrap_or(-1);
        tracing::debug!(program = %program, stdout = %render_tail(&stdout), "command output");

        if status.success() {
            tracing::info!(program = %program, duration_ms, "command succeeded");
            return Ok(());
        }

        let stderr_tail = render_tail(&stderr);
        tracing::warn!(program = %program, exit_code, duration_ms, stderr = %stderr_tail, "command failed");
        Err(CommandError::NonZeroExit {
            exit_code,
            stderr_tail,
        })
    }
}

/// Reads `reader` to end of stream, keeping only the last `limit` bytes.
async fn read_tail<R>(reader: Option<R>, limit: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(Vec::new());
    };
    let mut tail = Vec::with_capacity(limit);
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            return Ok(tail);
        }
        tail.extend_from_slice(&chunk[..read]);
        if tail.len() > limit {
            tail.drain(..tail.len() - limit);
        }
    }
}

fn render_tail(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}
