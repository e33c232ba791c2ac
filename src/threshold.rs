use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

use crate::host::HostStatus;

/// Per-host limits that decide whether a host is a problem target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Limits {
    /// Median RTT in milliseconds
    pub rtt_ms: f64,
    /// Packet loss in percent
    pub loss_percent: f64,
}

impl Limits {
    pub fn high_rtt(&self, host: &HostStatus) -> bool {
        host.median().is_some_and(|median| median >= self.rtt_ms)
    }

    pub fn high_loss(&self, host: &HostStatus) -> bool {
        host.loss_percent >= self.loss_percent
    }
}

/// Fleet-wide outcome of one run.
///
/// The two counts are independent: a host with both high RTT and high loss
/// is counted in each. `problem_targets` lists such a host only once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub hosts_high_rtt: usize,
    pub hosts_high_loss: usize,
    pub problem_targets: BTreeSet<String>,
}

impl AggregateResult {
    pub fn is_clean(&self) -> bool {
        self.hosts_high_rtt == 0 && self.hosts_high_loss == 0
    }
}

pub fn evaluate(hosts: &[HostStatus], limits: &Limits) -> AggregateResult {
    let mut result = AggregateResult::default();

    for host in hosts {
        if limits.high_rtt(host) {
            result.hosts_high_rtt += 1;
            result.problem_targets.insert(host.target.name.clone());
        }
        if limits.high_loss(host) {
            result.hosts_high_loss += 1;
            result.problem_targets.insert(host.target.name.clone());
        }
    }

    info!("Found number of hosts with high rtt: {}", result.hosts_high_rtt);
    info!("Found number of hosts with high loss: {}", result.hosts_high_loss);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{LatencyStats, Target};

    const LIMITS: Limits = Limits {
        rtt_ms: 100.0,
        loss_percent: 50.0,
    };

    fn status(name: &str, median: Option<f64>, loss_percent: f64) -> HostStatus {
        HostStatus {
            target: Target::new(name, "10.0.0.1".parse().unwrap()),
            samples: Vec::new(),
            latency: median.map(|m| LatencyStats {
                min: m,
                avg: m,
                max: m,
                median: m,
                jitter: 0.0,
            }),
            loss_percent,
            error_level: 0,
        }
    }

    #[test]
    fn slow_host_without_loss_is_a_problem() {
        let result = evaluate(&[status("slow", Some(120.0), 0.0)], &LIMITS);
        assert_eq!(result.hosts_high_rtt, 1);
        assert_eq!(result.hosts_high_loss, 0);
        assert!(result.problem_targets.contains("slow"));
    }

    #[test]
    fn limits_are_inclusive() {
        let result = evaluate(&[status("edge", Some(100.0), 50.0)], &LIMITS);
        assert_eq!(result.hosts_high_rtt, 1);
        assert_eq!(result.hosts_high_loss, 1);
    }

    #[test]
    fn host_in_both_categories_is_listed_once() {
        let hosts = [
            status("both", Some(150.0), 80.0),
            status("fine", Some(1.0), 0.0),
        ];
        let result = evaluate(&hosts, &LIMITS);
        assert_eq!(result.hosts_high_rtt, 1);
        assert_eq!(result.hosts_high_loss, 1);
        assert_eq!(
            result.problem_targets.into_iter().collect::<Vec<_>>(),
            vec!["both".to_string()]
        );
    }

    #[test]
    fn unreachable_host_counts_only_as_loss() {
        let result = evaluate(&[status("down", None, 100.0)], &LIMITS);
        assert_eq!(result.hosts_high_rtt, 0);
        assert_eq!(result.hosts_high_loss, 1);
        assert!(!result.is_clean());
    }
}
