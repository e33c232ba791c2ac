use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

use crate::check::{CheckConfig, TargetSource};
use crate::logging::{LogConfig, LogLevel};
use crate::pinger::Pinger;
use crate::range::{Range, Thresholds};
use crate::report::{Renderer, SortBy};
use crate::sink::{FileSink, NullSink, ReportSink};
use crate::threshold::Limits;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Check RTT and packet loss for a large number of hosts using fping",
    long_about = None
)]
pub struct Cli {
    /// Warning if # of hosts with high rtt is outside RANGE
    #[arg(short = 'w', long, value_name = "RANGE")]
    pub warning_rtt_hosts: Option<Range>,

    /// Critical if # of hosts with high rtt is outside RANGE
    #[arg(short = 'c', long, value_name = "RANGE")]
    pub critical_rtt_hosts: Option<Range>,

    /// Warning if # of hosts with high loss is outside RANGE
    #[arg(short = 'W', long, value_name = "RANGE")]
    pub warning_loss_hosts: Option<Range>,

    /// Critical if # of hosts with high loss is outside RANGE
    #[arg(short = 'C', long, value_name = "RANGE")]
    pub critical_loss_hosts: Option<Range>,

    /// Limit for the median rtt of a host in ms
    #[arg(short = 'r', long, default_value = "100")]
    pub limit_rtt_time: f64,

    /// Limit for the packet loss of a host in percent
    #[arg(short = 'l', long, default_value = "1")]
    pub limit_loss_perc: f64,

    /// One or more target hosts
    #[arg(
        short = 'H',
        long,
        num_args = 1..,
        conflicts_with = "file",
        required_unless_present = "file"
    )]
    pub hosts: Vec<String>,

    /// A file with target hosts, one per line
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Sort the report by target name or target address
    #[arg(short, long, value_enum, default_value = "targetip")]
    pub sort_by: SortBy,

    /// Abort fping after TIMEOUT seconds
    #[arg(short, long, default_value = "60")]
    pub timeout: u64,

    /// Number of pings to send to each target
    #[arg(short = 'n', long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub packet_count: u32,

    /// Size of the ping payload in bytes
    #[arg(short = 'b', long, default_value = "512")]
    pub packet_size: usize,

    /// Path of the fping binary
    #[arg(long, default_value = "/usr/bin/fping")]
    pub fping: PathBuf,

    /// Base directory for reports
    #[arg(long, default_value = "/var/www/html/rttloss")]
    pub report_dir: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value = "html")]
    pub format: Renderer,

    /// Do not write a report
    #[arg(long)]
    pub no_report: bool,

    /// Report title
    #[arg(long, default_value = "RTT and packet loss")]
    pub title: String,

    /// strftime format of the start time shown in the report
    #[arg(long, default_value = "%H:%M on %e %B %Y")]
    pub time_format: String,

    /// Log level for messages on stderr
    #[arg(long, value_enum, default_value = "error")]
    pub log_level: LogLevel,

    /// Increase output verbosity (use up to 2 times)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// `-H "a b" c` and `-H a b c` name the same three targets.
    fn target_source(&self) -> TargetSource {
        match &self.file {
            Some(path) => TargetSource::File(path.clone()),
            None => TargetSource::Hosts(
                self.hosts
                    .iter()
                    .flat_map(|h| h.split_whitespace())
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }

    pub fn check_config(&self) -> CheckConfig {
        CheckConfig {
            targets: self.target_source(),
            packet_count: self.packet_count,
            limits: Limits {
                rtt_ms: self.limit_rtt_time,
                loss_percent: self.limit_loss_perc,
            },
            rtt_thresholds: Thresholds::new(
                self.warning_rtt_hosts.clone(),
                self.critical_rtt_hosts.clone(),
            ),
            loss_thresholds: Thresholds::new(
                self.warning_loss_hosts.clone(),
                self.critical_loss_hosts.clone(),
            ),
            sort_by: self.sort_by,
            title: self.title.clone(),
            time_format: self.time_format.clone(),
        }
    }

    pub fn pinger(&self) -> Pinger {
        Pinger::new(
            self.fping.clone(),
            self.packet_count,
            self.packet_size,
            Duration::from_secs(self.timeout),
        )
    }

    pub fn report_sink(&self) -> Box<dyn ReportSink> {
        if self.no_report {
            Box::new(NullSink)
        } else {
            Box::new(FileSink::new(self.report_dir.clone(), self.format))
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("check_rttloss").chain(argv.iter().copied()))
    }

    #[test]
    fn defaults() {
        let cli = parse(&["-H", "a"]).unwrap();
        let config = cli.check_config();
        assert_eq!(config.packet_count, 10);
        assert_eq!(config.limits.rtt_ms, 100.0);
        assert_eq!(config.limits.loss_percent, 1.0);
        assert_eq!(config.sort_by, SortBy::Targetip);
        assert_eq!(config.rtt_thresholds, Thresholds::default());
        assert_eq!(cli.packet_size, 512);
        assert_eq!(cli.timeout, 60);
        assert_eq!(cli.format, Renderer::Html);
        assert_eq!(cli.log_config().level, LogLevel::Error);
    }

    #[test]
    fn hosts_may_be_space_separated() {
        let cli = parse(&["-H", "a b", "c"]).unwrap();
        assert_eq!(
            cli.check_config().targets,
            TargetSource::Hosts(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn hosts_and_file_are_exclusive() {
        assert!(parse(&["-H", "a", "-f", "hosts.txt"]).is_err());
        assert!(parse(&[]).is_err());

        let cli = parse(&["-f", "/etc/rttloss/core.txt", "-s", "targetname"]).unwrap();
        let config = cli.check_config();
        assert_eq!(config.source_label(), "core");
        assert_eq!(config.sort_by, SortBy::Targetname);
    }

    #[test]
    fn ranges_and_limits() {
        let cli = parse(&[
            "-H", "a", "-w", "0", "-c", "5", "-W", "1:", "-C", "@10:20", "-r", "50", "-l", "10",
            "-vv",
        ])
        .unwrap();
        let config = cli.check_config();
        assert_eq!(config.rtt_thresholds.warning.unwrap().to_string(), "0");
        assert_eq!(config.loss_thresholds.critical.unwrap().to_string(), "@10:20");
        assert_eq!(config.limits.rtt_ms, 50.0);
        assert_eq!(config.limits.loss_percent, 10.0);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn usage_errors_become_unknown_status_lines() {
        let err = parse(&["-H", "a", "-n", "0"]).unwrap_err();
        let line = crate::output::format_usage_error(&err);
        assert!(line.starts_with("RTTLOSS UNKNOWN - invalid value '0'"));
        assert_eq!(line.lines().count(), 1);

        let err = parse(&[]).unwrap_err();
        assert!(crate::output::format_usage_error(&err)
            .starts_with("RTTLOSS UNKNOWN - the following required arguments"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse(&["-H", "a", "-w", "5:1"]).is_err());
        assert!(parse(&["-H", "a", "-n", "0"]).is_err());
        assert!(parse(&["-H", "a", "-s", "mac"]).is_err());
    }
}
