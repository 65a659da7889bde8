//! Fireview - Entry Point
//!
//! One-shot deploy pipeline meant to run inside a CI job: reads its
//! configuration from the environment, deploys, reports, exits.

use std::env;
use std::process::ExitCode;

use fireview::app::options::AppOptions;
use fireview::app::run::run;
use fireview::github::context::GithubContext;
use fireview::logs::{init_logging, set_failed, LogLevel, LogOptions};

use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    // Print version and exit
    if env::args().skip(1).any(|arg| arg == "--version") {
        println!("fireview {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    // The runner sets RUNNER_DEBUG=1 when the workflow runs in debug mode
    let mut log_options = LogOptions::default();
    if matches!(env::var("RUNNER_DEBUG").as_deref(), Ok("1")) {
        log_options.log_level = LogLevel::Debug;
    }
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let options = match AppOptions::from_env() {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            set_failed(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let context = match GithubContext::from_env() {
        Ok(context) => context,
        Err(e) => {
            error!("Could not read the event context: {}", e);
            set_failed(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    match run(options, context).await {
        Ok(()) => ExitCode::SUCCESS,
        // Already reported through the check run and the job log
        Err(_) => ExitCode::FAILURE,
    }
}
