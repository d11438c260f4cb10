//! Running the external `unzip`, `tar` and `gunzip` tools

use crate::{
    error::{ExtractionError, Result},
    extractor::ExtractContext,
};
use std::{
    io::{BufRead, BufReader, Read},
    path::PathBuf,
    process::{Child, Command, ExitStatus, Output, Stdio},
    sync::atomic::{AtomicU64, Ordering},
};

/// Resolves `tool` on `PATH`.
pub(crate) fn locate(tool: &str) -> Result<PathBuf> {
    which::which(tool).map_err(|err| {
        ExtractionError::extraction_failed(format!("`{tool}` is not available: {err}"))
    })
}

/// Builds a command for `tool`, resolved on `PATH`.
pub(crate) fn command(tool: &str) -> Result<Command> {
    let mut command = Command::new(locate(tool)?);
    command.stdin(Stdio::null());
    Ok(command)
}

/// Whether `tool` can be found on `PATH`.
pub fn is_available(tool: &str) -> bool {
    which::which(tool).is_ok()
}

/// Runs `command` to completion and captures its output.
pub(crate) fn capture(mut command: Command) -> Result<Output> {
    tracing::debug!(?command, "running external tool");
    Ok(command.output()?)
}

/// The exit state of a monitored run.
#[derive(Debug)]
pub(crate) struct ToolRun {
    pub status: ExitStatus,
    pub stderr: String,
}

impl ToolRun {
    /// Converts a non-zero exit into [`ExtractionError::ExtractionFailed`].
    pub fn into_result(self, tool: &str) -> Result<()> {
        if self.status.success() {
            Ok(())
        } else {
            let stderr = self.stderr.trim();
            Err(ExtractionError::extraction_failed(if stderr.is_empty() {
                format!("{tool} exited with {}", self.status)
            } else {
                format!("{tool} exited with {}: {stderr}", self.status)
            }))
        }
    }
}

/// Spawns `command` and polls it every tick interval until it exits.
///
/// If stdout is piped its lines are counted. `on_tick` receives the tick
/// number and the number of stdout lines seen so far. Standard error is
/// captured. On cancellation the child is killed and
/// [`ExtractionError::UserCancelled`] is returned.
pub(crate) fn run_monitored(
    mut command: Command,
    ctx: &ExtractContext<'_>,
    mut on_tick: impl FnMut(u64, u64),
) -> Result<ToolRun> {
    tracing::debug!(?command, "spawning external tool");
    command.stderr(Stdio::piped());
    let mut child = command.spawn()?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let lines = AtomicU64::new(0);

    std::thread::scope(|scope| {
        let lines = &lines;
        let stdout_reader = stdout.map(|stdout| {
            scope.spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    if line.is_err() {
                        break;
                    }
                    lines.fetch_add(1, Ordering::Relaxed);
                }
            })
        });
        let stderr_reader = stderr.map(|mut stderr| {
            scope.spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            })
        });

        let mut tick = 0;
        let status = loop {
            if ctx.is_cancelled() {
                tracing::debug!(pid = child.id(), "cancelled, killing external tool");
                terminate(&mut child);
                return Err(ExtractionError::UserCancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    terminate(&mut child);
                    return Err(err.into());
                }
            }
            std::thread::sleep(ctx.tick_interval());
            tick += 1;
            on_tick(tick, lines.load(Ordering::Relaxed));
        };

        if let Some(reader) = stdout_reader {
            let _ = reader.join();
        }
        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();

        tracing::debug!(%status, "external tool exited");
        Ok(ToolRun { status, stderr })
    })
}

/// Kills and reaps `child`.
fn terminate(child: &mut Child) {
    if let Err(err) = child.kill() {
        tracing::warn!("failed to kill external tool: {err}");
    }
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgressReporter;
    use assert_matches::assert_matches;
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_failed_exit_carries_stderr() {
        if !is_available("sh") {
            return;
        }
        let mut command = command("sh").unwrap();
        command.arg("-c").arg("echo 'bad archive' >&2; exit 3");

        let reporter = NoProgressReporter;
        let run = run_monitored(command, &ExtractContext::new(&reporter), |_, _| {}).unwrap();
        assert!(!run.status.success());
        assert_matches!(
            run.into_result("sh"),
            Err(ExtractionError::ExtractionFailed { detail: Some(detail) })
                if detail.contains("bad archive")
        );
    }

    #[test]
    fn test_cancellation_kills_the_tool() {
        if !is_available("sleep") {
            return;
        }
        let mut command = command("sleep").unwrap();
        command.arg("5");

        let reporter = NoProgressReporter;
        let cancellation = CancellationToken::new();
        let ctx = ExtractContext::new(&reporter)
            .with_cancellation(cancellation.clone())
            .with_tick_interval(Duration::from_millis(5));

        let started = Instant::now();
        let result = run_monitored(command, &ctx, |_, _| cancellation.cancel());
        assert_matches!(result, Err(ExtractionError::UserCancelled));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
