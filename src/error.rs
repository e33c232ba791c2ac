use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("fping timed out after {}s", after.as_secs())]
    ProbeTimeout { after: Duration },

    #[error("Failed to launch fping: {0}")]
    ProbeLaunch(#[source] io::Error),

    #[error("fping failed without output (exit status {})", code.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    ProbeFailed { code: Option<i32> },

    #[error("Failed to collect fping output: {0}")]
    ProbeIo(#[source] io::Error),

    #[error("Failed to read hosts file {}: {source}", path.display())]
    HostsFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No target hosts specified")]
    NoTargets,

    #[error("Invalid range expression: {0}")]
    InvalidRange(String),

    #[error("Failed to render report: {0}")]
    Render(String),

    #[error("Failed to write report {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type CheckResult<T> = Result<T, CheckError>;
