use clap::{Parser, ValueHint};
use std::path::PathBuf;

/// Download Harvest timesheets as CSV and optionally send an invoice
#[derive(Parser)]
#[clap(version)]
pub struct Opts {
    /// Path to the key=value configuration file
    #[clap(short, long, default_value=".env",
        value_hint=ValueHint::FilePath)]
    pub file: PathBuf,

    /// Re-run the configuration wizard even if configuration exists
    #[clap(long)]
    pub configure: bool,

    /// Enable debug logging
    #[clap(short, long)]
    pub verbose: bool,
}
