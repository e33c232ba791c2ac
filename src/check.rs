use chrono::{DateTime, Local};
use std::fmt::Write;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{CheckError, CheckResult};
use crate::host::{load_hosts_from_file, source_label, HostStatus};
use crate::parser::parse_output;
use crate::pinger::Probe;
use crate::range::{Status, Thresholds};
use crate::report::{Report, ReportMetadata, SortBy};
use crate::sink::ReportSink;
use crate::stats::host_status;
use crate::threshold::{evaluate, AggregateResult, Limits};

#[derive(Debug, Clone, PartialEq)]
pub enum TargetSource {
    Hosts(Vec<String>),
    File(PathBuf),
}

/// Everything one check run needs, independent of how it was configured.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub targets: TargetSource,
    pub packet_count: u32,
    pub limits: Limits,
    pub rtt_thresholds: Thresholds,
    pub loss_thresholds: Thresholds,
    pub sort_by: SortBy,
    pub title: String,
    /// strftime pattern for the start time shown in reports
    pub time_format: String,
}

impl CheckConfig {
    pub fn source_label(&self) -> String {
        match &self.targets {
            TargetSource::Hosts(_) => source_label(None),
            TargetSource::File(path) => source_label(Some(path.as_path())),
        }
    }

    pub fn load_targets(&self) -> CheckResult<Vec<String>> {
        let targets = match &self.targets {
            TargetSource::Hosts(hosts) => hosts.clone(),
            TargetSource::File(path) => load_hosts_from_file(path)?,
        };
        if targets.is_empty() {
            return Err(CheckError::NoTargets);
        }
        Ok(targets)
    }
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub aggregate: AggregateResult,
    /// Host results in report order
    pub hosts: Vec<HostStatus>,
    pub rtt_status: Status,
    pub loss_status: Status,
    pub artifact: Option<PathBuf>,
}

impl CheckOutcome {
    pub fn status(&self) -> Status {
        self.rtt_status.max(self.loss_status)
    }
}

/// Probe all targets once, derive per-host statistics, persist the report and
/// evaluate both host counts against their ranges.
pub async fn run_check<P: Probe, S: ReportSink + ?Sized>(
    config: &CheckConfig,
    probe: &P,
    sink: &S,
) -> CheckResult<CheckOutcome> {
    let targets = config.load_targets()?;
    let started_at = Local::now();
    let start_time = format_start_time(&started_at, &config.time_format);
    info!("Stored start time: {}", start_time);

    let output = probe.run(&targets).await?;

    let hosts: Vec<HostStatus> = parse_output(&output)
        .into_iter()
        .map(|host| host_status(host, config.packet_count, config.limits.rtt_ms))
        .collect();
    if hosts.len() < targets.len() {
        debug!(
            "fping reported on {} of {} targets",
            hosts.len(),
            targets.len()
        );
    }

    let aggregate = evaluate(&hosts, &config.limits);

    let metadata = ReportMetadata {
        title: config.title.clone(),
        started_at,
        start_time,
        sort_by: config.sort_by,
        source_label: config.source_label(),
        packet_count: config.packet_count,
        limits: config.limits,
    };
    let report = Report::new(metadata, hosts);
    let artifact = sink.publish(&report, &aggregate)?;

    let rtt_status = config
        .rtt_thresholds
        .evaluate(aggregate.hosts_high_rtt as f64);
    let loss_status = config
        .loss_thresholds
        .evaluate(aggregate.hosts_high_loss as f64);
    info!(
        "Probe results - RTT: {}, Loss: {}, affected targets: {:?}",
        aggregate.hosts_high_rtt, aggregate.hosts_high_loss, aggregate.problem_targets
    );

    Ok(CheckOutcome {
        aggregate,
        hosts: report.hosts,
        rtt_status,
        loss_status,
        artifact,
    })
}

fn format_start_time(at: &DateTime<Local>, pattern: &str) -> String {
    let mut formatted = String::new();
    if write!(formatted, "{}", at.format(pattern)).is_err() {
        warn!("Invalid time format {:?}, using RFC 3339", pattern);
        return at.to_rfc3339();
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write as _;

    enum FakeProbe {
        Output(&'static str),
        TimedOut,
        Failed,
    }

    impl Probe for FakeProbe {
        async fn run(&self, _targets: &[String]) -> CheckResult<String> {
            match self {
                FakeProbe::Output(output) => Ok(output.to_string()),
                FakeProbe::TimedOut => Err(CheckError::ProbeTimeout {
                    after: std::time::Duration::from_secs(60),
                }),
                FakeProbe::Failed => Err(CheckError::ProbeFailed { code: Some(4) }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        published: RefCell<Vec<(Report, AggregateResult)>>,
    }

    impl ReportSink for RecordingSink {
        fn publish(
            &self,
            report: &Report,
            aggregate: &AggregateResult,
        ) -> CheckResult<Option<PathBuf>> {
            self.published
                .borrow_mut()
                .push((report.clone(), aggregate.clone()));
            Ok(None)
        }
    }

    fn config(hosts: &[&str]) -> CheckConfig {
        CheckConfig {
            targets: TargetSource::Hosts(hosts.iter().map(|h| h.to_string()).collect()),
            packet_count: 4,
            limits: Limits {
                rtt_ms: 100.0,
                loss_percent: 50.0,
            },
            rtt_thresholds: Thresholds::default(),
            loss_thresholds: Thresholds::new(Some("0".parse().unwrap()), None),
            sort_by: SortBy::Targetname,
            title: "test".to_string(),
            time_format: "%H:%M".to_string(),
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_a_loss_problem() {
        let probe = FakeProbe::Output("b (1.1.1.2) : - - - -\na (1.1.1.1) : 10 10 10 10\n");
        let sink = RecordingSink::default();

        let outcome = run_check(&config(&["a", "b"]), &probe, &sink).await.unwrap();
        assert_eq!(outcome.aggregate.hosts_high_rtt, 0);
        assert_eq!(outcome.aggregate.hosts_high_loss, 1);
        assert_eq!(
            outcome.aggregate.problem_targets.iter().collect::<Vec<_>>(),
            vec!["b"]
        );
        assert_eq!(outcome.rtt_status, Status::Ok);
        assert_eq!(outcome.loss_status, Status::Warning);
        assert_eq!(outcome.status(), Status::Warning);

        let published = sink.published.borrow();
        assert_eq!(published.len(), 1);
        let (report, _) = &published[0];
        assert_eq!(report.metadata.source_label, "hosts");
        let names: Vec<_> = report.hosts.iter().map(|h| h.target.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(report.hosts[0].median(), Some(10.0));
    }

    #[tokio::test]
    async fn silent_targets_are_missing_not_failed() {
        let probe = FakeProbe::Output("a (1.1.1.1) : 10 10 10 10\n");
        let sink = RecordingSink::default();

        let outcome = run_check(&config(&["a", "b"]), &probe, &sink).await.unwrap();
        assert_eq!(outcome.hosts.len(), 1);
        assert!(outcome.aggregate.is_clean());
        assert_eq!(outcome.status(), Status::Ok);
    }

    #[tokio::test]
    async fn probe_failure_produces_no_report() {
        let probe = FakeProbe::TimedOut;
        let sink = RecordingSink::default();

        let err = run_check(&config(&["a"]), &probe, &sink).await.unwrap_err();
        assert!(matches!(err, CheckError::ProbeTimeout { .. }));
        assert!(sink.published.borrow().is_empty());
    }

    #[tokio::test]
    async fn failed_probe_is_not_reported_as_ok() {
        let sink = RecordingSink::default();

        let err = run_check(&config(&["a"]), &FakeProbe::Failed, &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::ProbeFailed { .. }));
        assert!(sink.published.borrow().is_empty());
    }

    #[tokio::test]
    async fn hosts_file_with_only_comments_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file).unwrap();
        let mut cfg = config(&[]);
        cfg.targets = TargetSource::File(file.path().to_path_buf());
        let sink = RecordingSink::default();

        let err = run_check(&cfg, &FakeProbe::Output(""), &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::NoTargets));
        assert!(sink.published.borrow().is_empty());
    }

    #[tokio::test]
    async fn empty_target_list_is_rejected() {
        let probe = FakeProbe::Output("");
        let sink = RecordingSink::default();

        let err = run_check(&config(&[]), &probe, &sink).await.unwrap_err();
        assert!(matches!(err, CheckError::NoTargets));
    }

    #[test]
    fn bad_time_format_falls_back_to_rfc3339() {
        let at = Local::now();
        assert_eq!(format_start_time(&at, "%Q"), at.to_rfc3339());
        assert_eq!(format_start_time(&at, "%Y"), at.format("%Y").to_string());
    }

    #[test]
    fn file_targets_are_labelled_by_file_name() {
        let mut cfg = config(&[]);
        cfg.targets = TargetSource::File(PathBuf::from("/etc/rttloss/branches.list"));
        assert_eq!(cfg.source_label(), "branches");
    }
}
