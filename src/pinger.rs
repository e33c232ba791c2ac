use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::error::{CheckError, CheckResult};

/// Something that probes a batch of targets and hands back fping-style text.
pub trait Probe {
    async fn run(&self, targets: &[String]) -> CheckResult<String>;
}

/// Runs fping once for the whole target list.
pub struct Pinger {
    /// Path of the fping binary
    program: PathBuf,
    /// Packets sent to every target
    count: u32,
    /// Payload size in bytes
    size: usize,
    /// Upper bound for the whole fping run
    timeout: Duration,
}

impl Pinger {
    pub fn new(program: impl Into<PathBuf>, count: u32, size: usize, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            count,
            size,
            timeout,
        }
    }

    /// Quiet, per-target sample listing with addresses, random payload of the
    /// configured size and count, followed by the targets.
    pub fn args(&self, targets: &[String]) -> Vec<String> {
        let mut args = vec![
            "-q".to_string(),
            "-d".to_string(),
            "-A".to_string(),
            "-R".to_string(),
            "-b".to_string(),
            self.size.to_string(),
            "-C".to_string(),
            self.count.to_string(),
        ];
        args.extend(targets.iter().cloned());
        args
    }
}

impl Probe for Pinger {
    async fn run(&self, targets: &[String]) -> CheckResult<String> {
        let args = self.args(targets);
        info!(
            "Starting fping with \"{} {}\"",
            self.program.display(),
            args.join(" ")
        );

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!("Failed to start {}: {}", self.program.display(), e);
                CheckError::ProbeLaunch(e)
            })?;

        let (status, output) = match time::timeout(self.timeout, collect_stderr(&mut child)).await {
            Ok(result) => result.map_err(CheckError::ProbeIo)?,
            Err(_) => {
                error!("fping timed out after {:?}", self.timeout);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out fping: {}", e);
                }
                return Err(CheckError::ProbeTimeout {
                    after: self.timeout,
                });
            }
        };

        debug!("Found output: {:?}", output);
        if !status.success() {
            // fping exits non-zero as soon as a single target is unreachable
            info!("fping returned non-zero exit status {:?}", status.code());
            if output.trim().is_empty() {
                error!("fping failed and produced no output");
                return Err(CheckError::ProbeFailed {
                    code: status.code(),
                });
            }
        }

        Ok(output)
    }
}

async fn collect_stderr(child: &mut Child) -> io::Result<(ExitStatus, String)> {
    let mut buffer = Vec::new();
    if let Some(mut stderr) = child.stderr.take() {
        stderr.read_to_end(&mut buffer).await?;
    }
    let status = child.wait().await?;
    Ok((status, String::from_utf8_lossy(&buffer).into_owned()))
}
