//! Child process helpers for audio transcoding

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

/// Upper bound for a single transcode
pub const TRANSCODE_TIMEOUT: Duration = Duration::from_secs(30);

fn exit_status_code_parts(code: Option<i32>, _signal: Option<i32>) -> Option<i32> {
    if let Some(code) = code {
        return Some(code);
    }
    #[cfg(unix)]
    {
        if let Some(signal) = _signal {
            return Some(128 + signal);
        }
    }
    None
}

/// Exit code, using 128+signal for signal-terminated processes on Unix
pub(crate) fn exit_status_code(status: &std::process::ExitStatus) -> Option<i32> {
    let code = status.code();
    #[cfg(unix)]
    let signal = status.signal();
    #[cfg(not(unix))]
    let signal = None;
    exit_status_code_parts(code, signal)
}

async fn capture_exit_code(child: &mut Child) -> Option<i32> {
    match child.try_wait() {
        Ok(Some(status)) => exit_status_code(&status),
        Ok(None) => child
            .wait()
            .await
            .ok()
            .and_then(|status| exit_status_code(&status)),
        Err(_) => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Errors from running a child process to completion
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed reading {stream:?} (exit code {exit_code:?}): {source}")]
    Read {
        stream: OutputStream,
        source: std::io::Error,
        exit_code: Option<i32>,
    },

    #[error("failed waiting for process: {source}")]
    Wait { source: std::io::Error },

    #[error("'{program}' did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("'{program}' exited with code {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Wait for child output, reading stdout and stderr concurrently to avoid deadlock
pub(crate) async fn wait_for_child_output(
    child: &mut Child,
) -> Result<(String, String, std::process::ExitStatus), ProcessError> {
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let stdout_fut = async move {
        if let Some(mut out) = stdout_pipe {
            let mut buf = String::new();
            out.read_to_string(&mut buf)
                .await
                .map(|_| buf)
                .map_err(|e| (OutputStream::Stdout, e))
        } else {
            Ok(String::new())
        }
    };

    let stderr_fut = async move {
        if let Some(mut err) = stderr_pipe {
            let mut buf = String::new();
            err.read_to_string(&mut buf)
                .await
                .map(|_| buf)
                .map_err(|e| (OutputStream::Stderr, e))
        } else {
            Ok(String::new())
        }
    };

    let (stdout, stderr) = match tokio::try_join!(stdout_fut, stderr_fut) {
        Ok(result) => result,
        Err((stream, e)) => {
            let _ = child.kill().await;
            let exit_code = capture_exit_code(child).await;
            return Err(ProcessError::Read {
                stream,
                source: e,
                exit_code,
            });
        }
    };

    let status = child
        .wait()
        .await
        .map_err(|e| ProcessError::Wait { source: e })?;

    Ok((stdout, stderr, status))
}

/// ffmpeg arguments for a mono 16-bit PCM WAV at `sample_rate`
fn transcode_args(input: &Path, output: &Path, sample_rate: u32) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-i".into(),
        input.display().to_string(),
        "-ac".into(),
        "1".into(),
        "-ar".into(),
        sample_rate.to_string(),
        "-acodec".into(),
        "pcm_s16le".into(),
        output.display().to_string(),
    ]
}

/// Transcode `input` into a mono WAV at `output` with ffmpeg
pub async fn transcode_to_wav(
    ffmpeg: &str,
    input: &Path,
    output: &Path,
    sample_rate: u32,
    timeout: Duration,
) -> Result<(), ProcessError> {
    let mut child = Command::new(ffmpeg)
        .args(transcode_args(input, output, sample_rate))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ProcessError::Spawn {
            program: ffmpeg.to_string(),
            source: e,
        })?;

    let (_stdout, stderr, status) =
        match tokio::time::timeout(timeout, wait_for_child_output(&mut child)).await {
            Ok(result) => result?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(ProcessError::Timeout {
                    program: ffmpeg.to_string(),
                    timeout,
                });
            }
        };

    if !status.success() {
        return Err(ProcessError::Failed {
            program: ffmpeg.to_string(),
            code: exit_status_code(&status),
            stderr: stderr.trim().to_string(),
        });
    }

    tracing::debug!(input = %input.display(), output = %output.display(), "Transcoded audio");
    Ok(())
}

/// Whether `program -version` runs successfully
pub async fn program_available(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
