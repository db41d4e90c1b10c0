//! Main application entry point.

use clap::Parser;
use stagegraph_app::{run, ReplayConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = ReplayConfig::parse();

    env_logger::init();
    log::info!("Starting StageGraph");
    log::debug!("Parsed arguments: {:?}", config);

    match run(&config) {
        Ok(report) => {
            println!("{}", report.document);
            for message in &report.notifications {
                eprintln!("warning: {}", message);
            }
            eprintln!("{}", report.history);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
