use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::path::Path;

use crate::error::{CheckError, CheckResult};

/// Label used for report paths when targets come from the command line.
pub const DEFAULT_SOURCE_LABEL: &str = "hosts";

/// A monitored host as reported by fping: the name it was given and the
/// address it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    pub name: String,
    pub addr: IpAddr,
}

impl Target {
    pub fn new(name: impl Into<String>, addr: IpAddr) -> Self {
        Self {
            name: name.into(),
            addr,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.addr)
    }
}

/// One probe measurement. Lost packets serialize as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Sample {
    /// Round trip time in milliseconds.
    Reply(f64),
    Lost,
}

impl Sample {
    pub fn rtt(&self) -> Option<f64> {
        match self {
            Sample::Reply(rtt) => Some(*rtt),
            Sample::Lost => None,
        }
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, Sample::Lost)
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Reply(rtt) => write!(f, "{}", rtt),
            Sample::Lost => f.write_str("-"),
        }
    }
}

/// Latency figures over the successful samples of a host, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub median: f64,
    pub jitter: f64,
}

/// Everything known about one host after a run.
///
/// `latency` is `None` when every packet was lost; loss and error level are
/// always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostStatus {
    pub target: Target,
    pub samples: Vec<Sample>,
    pub latency: Option<LatencyStats>,
    pub loss_percent: f64,
    pub error_level: u32,
}

impl HostStatus {
    pub fn median(&self) -> Option<f64> {
        self.latency.map(|l| l.median)
    }
}

pub fn load_hosts_from_file(file_path: &Path) -> CheckResult<Vec<String>> {
    let file_content =
        std::fs::read_to_string(file_path).map_err(|source| CheckError::HostsFile {
            path: file_path.to_path_buf(),
            source,
        })?;
    Ok(parse_hosts(&file_content))
}

fn parse_hosts(content: &str) -> Vec<String> {
    let mut hosts = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if !line.is_empty() && !line.starts_with('#') {
            hosts.push(line.to_string());
        }
    }

    hosts
}

/// Derive the report label from the hosts file name, e.g. `core.txt` -> `core`.
pub fn source_label(file: Option<&Path>) -> String {
    file.and_then(|path| path.file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| DEFAULT_SOURCE_LABEL.to_string())
}
