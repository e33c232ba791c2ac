use tracing::info;

use crate::host::{HostStatus, LatencyStats, Sample};
use crate::parser::ParsedHost;

pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Middle value of the sorted samples, or the mean of the two middle values
/// for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Mean absolute difference between consecutive samples in probe order.
pub fn jitter(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let total: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    total / (values.len() - 1) as f64
}

/// Loss against the number of packets fping was asked to send, not the
/// number of samples it reported.
pub fn loss_percent(lost: usize, packet_count: u32) -> f64 {
    if packet_count == 0 {
        return 0.0;
    }
    lost as f64 / packet_count as f64 * 100.0
}

/// One point per lost packet and per reply at or above the RTT limit.
pub fn error_level(samples: &[Sample], rtt_limit: f64) -> u32 {
    samples
        .iter()
        .filter(|sample| match sample {
            Sample::Lost => true,
            Sample::Reply(rtt) => *rtt >= rtt_limit,
        })
        .count() as u32
}

pub fn latency_stats(samples: &[Sample]) -> Option<LatencyStats> {
    let results: Vec<f64> = samples.iter().filter_map(Sample::rtt).collect();
    let avg = average(&results)?;
    let median = median(&results)?;

    Some(LatencyStats {
        min: results.iter().copied().fold(f64::INFINITY, f64::min),
        avg,
        max: results.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        median,
        jitter: jitter(&results),
    })
}

pub fn host_status(host: ParsedHost, packet_count: u32, rtt_limit: f64) -> HostStatus {
    let lost = host.samples.iter().filter(|s| s.is_lost()).count();
    let latency = latency_stats(&host.samples);
    let loss = loss_percent(lost, packet_count);
    let errors = error_level(&host.samples, rtt_limit);

    match latency {
        Some(l) => info!(
            "{}: min {:.2} avg {:.2} max {:.2} median {:.2} jitter {:.2} loss {:.2}%",
            host.target, l.min, l.avg, l.max, l.median, l.jitter, loss
        ),
        None => info!("{}: no replies, loss {:.2}%", host.target, loss),
    }

    HostStatus {
        target: host.target,
        samples: host.samples,
        latency,
        loss_percent: loss,
        error_level: errors,
    }
}
