use crate::error::ExecutionError;
use crate::runner::context::ExecutionContext;
use crate::runner::materializer::{RunConfiguration, CONFIG_FILE};
use crate::utils::binary_resolver::RunnerCommand;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// How long output pipes may keep draining after the runner exited or was
/// killed. Leftover grandchildren can hold them open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Captured result of one runner process
#[derive(Debug, Clone, Default)]
pub struct RunnerOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when killed by signal or timeout
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration_ms: u64,
}

/// Run `<runner> test --config playwright.config.js --reporter=json` in the
/// context root.
///
/// A non-zero exit is a normal outcome (failed assertions) and is returned as
/// `Ok`. Only a spawn failure is an `Err`; a timeout is reported through
/// [`RunnerOutput::timed_out`] so the partial output is not lost.
pub async fn invoke(
    runner: &RunnerCommand,
    context: &ExecutionContext,
    run_config: &RunConfiguration,
    timeout: Duration,
) -> Result<RunnerOutput, ExecutionError> {
    let mut cmd = runner.command();
    cmd.args(["test", "--config", CONFIG_FILE, "--reporter=json"])
        .current_dir(context.root())
        .env("PLAYWRIGHT_JSON_OUTPUT_NAME", &run_config.report_path)
        .env("CI", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group so a timeout also takes down spawned browsers
    #[cfg(unix)]
    {
        cmd.process_group(0);
    }

    log::debug!("Launching runner: {} (cwd {})", runner, context.root().display());

    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|source| ExecutionError::RunnerLaunch {
        program: runner.to_string(),
        source,
    })?;

    let stdout_task = child.stdout.take().map(drain);
    let stderr_task = child.stderr.take().map(drain);

    let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => (status.code(), false),
        Ok(Err(e)) => {
            log::warn!("Failed to wait for runner: {}", e);
            (None, false)
        }
        Err(_) => {
            log::warn!(
                "Runner exceeded {}ms, killing process tree",
                timeout.as_millis()
            );
            kill_tree(&mut child).await;
            (None, true)
        }
    };

    let (stdout, stderr) = tokio::join!(collect(stdout_task), collect(stderr_task));

    Ok(RunnerOutput {
        stdout,
        stderr,
        exit_code,
        timed_out,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

/// Output pipe being read in the background. Bytes land in `buf` as they
/// arrive, so whatever was read survives an aborted reader.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

fn drain<R>(mut reader: R) -> Drain
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buf);
    let task = tokio::spawn(async move {
        let mut chunk = Vec::with_capacity(8192);
        loop {
            chunk.clear();
            match reader.read_buf(&mut chunk).await {
                Ok(0) => break,
                Ok(_) => {
                    let mut out = sink.lock().unwrap_or_else(PoisonError::into_inner);
                    out.extend_from_slice(&chunk);
                }
                Err(e) => {
                    log::warn!("Output reader failed: {}", e);
                    break;
                }
            }
        }
    });
    Drain { buf, task }
}

async fn collect(drain: Option<Drain>) -> String {
    let Some(Drain { buf, mut task }) = drain else {
        return String::new();
    };
    if tokio::time::timeout(DRAIN_GRACE, &mut task).await.is_err() {
        log::warn!("Runner output pipe still held open, keeping what was read so far");
        task.abort();
    }
    let bytes = buf.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
}

async fn kill_tree(child: &mut tokio::process::Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // The child leads its own process group (process_group(0) above)
            unsafe {
                libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
            }
        }
    }
    if let Err(e) = child.kill().await {
        log::debug!("Runner already gone after group kill: {}", e);
    }
}
