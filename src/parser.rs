//! Parsing of `fping -C` per-target output.
//!
//! With `-q -C <count>` fping prints one line per target on stderr:
//!
//! ```text
//! host1.example (10.0.0.1) : 0.52 - 1.20 -
//! ```
//!
//! Every token after the colon is either a round trip time in milliseconds
//! or `-` for a lost packet, in the order the packets were sent.

use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::host::{Sample, Target};

const LOSS_MARKER: &str = "-";

static LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)\s+\(([^)]+)\)\s+:\s+(.+)$").expect("fping line pattern is valid")
});

/// Samples reported for one target, in probe order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHost {
    pub target: Target,
    pub samples: Vec<Sample>,
}

/// Turn raw fping output into per-target sample sequences.
///
/// Hosts keep the order in which they first appear. Lines that do not look
/// like a per-target result are skipped; targets fping never reported on are
/// simply absent.
pub fn parse_output(output: &str) -> Vec<ParsedHost> {
    let mut hosts: Vec<ParsedHost> = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(host) = parse_line(line) else {
            debug!("Skipping line: {:?}", line);
            continue;
        };
        info!("Found result per host for target: {}", host.target);

        match hosts.iter_mut().find(|h| h.target == host.target) {
            Some(existing) => {
                warn!("Duplicate result for {}, keeping the last one", host.target);
                existing.samples = host.samples;
            }
            None => hosts.push(host),
        }
    }

    hosts
}

fn parse_line(line: &str) -> Option<ParsedHost> {
    let caps = LINE.captures(line)?;
    let name = caps.get(1)?.as_str();
    let addr = match caps[2].trim().parse::<IpAddr>() {
        Ok(addr) => addr,
        Err(_) => {
            debug!("Not an address in line for {}: {:?}", name, &caps[2]);
            return None;
        }
    };
    let target = Target::new(name, addr);

    let samples = caps[3]
        .split(' ')
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let sample = parse_token(token);
            if sample.is_none() {
                warn!("Dropping unparsable sample {:?} for {}", token, target);
            }
            sample
        })
        .collect();

    Some(ParsedHost { target, samples })
}

fn parse_token(token: &str) -> Option<Sample> {
    if token == LOSS_MARKER {
        return Some(Sample::Lost);
    }
    match token.parse::<f64>() {
        Ok(rtt) if rtt.is_finite() && rtt >= 0.0 => Some(Sample::Reply(rtt)),
        _ => None,
    }
}
