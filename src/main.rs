mod billing;
mod calendar;
mod cli;
mod config;
mod harvest;
mod input;
mod run;
mod timesheet;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Opts;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let opts = Opts::parse();

    let filter = if opts.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    if let Err(error) = run::run(opts).await {
        eprintln!("{}", error);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
