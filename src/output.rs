use crate::check::CheckOutcome;
use crate::error::CheckError;
use crate::host::HostStatus;
use crate::range::{Range, Status, Thresholds};

const CHECK_NAME: &str = "RTTLOSS";

fn metric_summary(value: usize, label: &str, status: Status, thresholds: &Thresholds) -> String {
    match thresholds.breached(status) {
        Some(range) => format!("{} hosts {} failure (outside range {})", value, label, range),
        None => format!("{} hosts {} failure", value, label),
    }
}

fn range_text(range: Option<&Range>) -> String {
    range.map(|r| r.to_string()).unwrap_or_default()
}

/// `label=value;warn;crit` without trailing empty fields.
pub fn perfdata(label: &str, value: usize, thresholds: &Thresholds) -> String {
    let fields = [
        value.to_string(),
        range_text(thresholds.warning.as_ref()),
        range_text(thresholds.critical.as_ref()),
    ];
    let used = fields
        .iter()
        .rposition(|f| !f.is_empty())
        .map_or(1, |i| i + 1);
    format!("{}={}", label, fields[..used].join(";"))
}

fn format_host(host: &HostStatus) -> String {
    let median = host
        .median()
        .map_or_else(|| "-".to_string(), |m| format!("{:.2}ms", m));
    format!(
        "{}: median={} loss={:.2}% errors={}",
        host.target, median, host.loss_percent, host.error_level
    )
}

/// Status line plus long output, ready for stdout.
pub fn format_outcome(
    outcome: &CheckOutcome,
    rtt: &Thresholds,
    loss: &Thresholds,
    verbose: u8,
) -> String {
    let aggregate = &outcome.aggregate;
    let mut out = format!(
        "{} {} - {}, {} | {} {}",
        CHECK_NAME,
        outcome.status(),
        metric_summary(aggregate.hosts_high_rtt, "rtt", outcome.rtt_status, rtt),
        metric_summary(aggregate.hosts_high_loss, "loss", outcome.loss_status, loss),
        perfdata("rtt", aggregate.hosts_high_rtt, rtt),
        perfdata("loss", aggregate.hosts_high_loss, loss),
    );

    if verbose >= 1 && !aggregate.problem_targets.is_empty() {
        let names: Vec<&str> = aggregate
            .problem_targets
            .iter()
            .map(String::as_str)
            .collect();
        out.push_str(&format!("\nproblem hosts: {}", names.join(", ")));
    }
    if verbose >= 1 {
        if let Some(path) = &outcome.artifact {
            out.push_str(&format!("\nreport: {}", path.display()));
        }
    }
    if verbose >= 2 {
        for host in &outcome.hosts {
            out.push('\n');
            out.push_str(&format_host(host));
        }
    }

    out
}

pub fn format_error(err: &CheckError) -> String {
    format!("{} {} - {}", CHECK_NAME, Status::Unknown, err)
}

/// First line of a clap usage error, as an UNKNOWN status line.
pub fn format_usage_error(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    let message = first.strip_prefix("error: ").unwrap_or(first);
    format!("{} {} - {}", CHECK_NAME, Status::Unknown, message)
}
