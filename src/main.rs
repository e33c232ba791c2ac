mod check;
mod cli;
mod error;
mod host;
mod logging;
mod output;
mod parser;
mod pinger;
mod range;
mod report;
mod sink;
mod stats;
mod threshold;

use clap::Parser;
use cli::Cli;
use check::run_check;
use logging::init_logging;
use output::{format_error, format_outcome, format_usage_error};
use range::Status;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Usage errors are UNKNOWN for a monitoring plugin, not clap's exit code 2
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            println!("{}", format_usage_error(&e));
            let _ = e.print();
            Status::Unknown.exit();
        }
    };

    if let Err(e) = init_logging(&cli.log_config()) {
        println!("RTTLOSS UNKNOWN - {:#}", e);
        Status::Unknown.exit();
    }

    let config = cli.check_config();
    let pinger = cli.pinger();
    let sink = cli.report_sink();

    let status = match run_check(&config, &pinger, sink.as_ref()).await {
        Ok(outcome) => {
            println!(
                "{}",
                format_outcome(
                    &outcome,
                    &config.rtt_thresholds,
                    &config.loss_thresholds,
                    cli.verbose
                )
            );
            outcome.status()
        }
        Err(e) => {
            error!("{}", e);
            println!("{}", format_error(&e));
            Status::Unknown
        }
    };

    status.exit();
}
