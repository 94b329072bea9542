use std::process::ExitCode;

use bingdaily::{exits_through_clap, failure_stage, BingDailyApp, Cli};
use clap::Parser;
use log::{error, info};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if exits_through_clap(&e) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };
    init_logging(cli.verbose);

    let app = match BingDailyApp::new(&cli) {
        Ok(app) => app,
        Err(e) => {
            error!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match app.run() {
        Ok(outcome) => {
            info!(
                "Done: {} ({})",
                outcome.path.display(),
                outcome.resolution
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{} step failed: {}", failure_stage(&e), e);
            ExitCode::FAILURE
        }
    }
}
