use std::collections::HashMap;
use std::path::PathBuf;

use inquire::error::InquireError;
use inquire::{Confirm, Select, Text};

use crate::billing::Period;
use crate::config::Config;
use crate::harvest;

type InputResult<T> = Result<T, InquireError>;

/// The driver's suspension points, as a capability so tests can script
/// the answers.
pub trait Prompt {
    fn select_period(&mut self, periods: Vec<Period>) -> InputResult<Period>;

    fn select_client(
        &mut self,
        clients: Vec<harvest::Client>,
    ) -> InputResult<harvest::Client>;

    fn confirm_invoice(&mut self) -> InputResult<bool>;
}

pub struct Terminal;

impl Prompt for Terminal {
    fn select_period(&mut self, periods: Vec<Period>) -> InputResult<Period> {
        Select::new("Fetch time for which period?", periods).prompt()
    }

    fn select_client(
        &mut self,
        mut clients: Vec<harvest::Client>,
    ) -> InputResult<harvest::Client> {
        // The client most recently added to Harvest lists last; show it
        // first since it is usually the one being billed.
        clients.reverse();
        Select::new(
            "Please select which client to download data for:",
            clients,
        )
        .prompt()
    }

    fn confirm_invoice(&mut self) -> InputResult<bool> {
        Confirm::new("Create and send an invoice for this period?")
            .with_default(false)
            .prompt()
    }
}

/// First-run wizard. Pre-fills each answer with whatever partial
/// configuration is already on disk.
pub fn configure(existing: &HashMap<String, String>) -> InputResult<Config> {
    println!(
        "Welcome, make sure you've generated a personal access token \
         over at: https://id.getharvest.com/developers\n"
    );

    let subdomain = text(
        "What is your harvest subdomain?",
        existing.get("SUBDOMAIN").map(String::as_str),
    )?;
    let account_id = text(
        "What is your account ID?",
        existing.get("ACCOUNT_ID").map(String::as_str),
    )?;
    let access_token = text(
        "What is your personal access token?",
        existing.get("ACCESS_TOKEN").map(String::as_str),
    )?;

    let default_folder = existing
        .get("OUTPUT_FOLDER")
        .cloned()
        .or_else(|| dirs::download_dir().map(|p| p.display().to_string()));
    let output_folder = text(
        "Where should we save the CSV files to?",
        default_folder.as_deref(),
    )?;

    Ok(Config {
        subdomain,
        account_id,
        access_token,
        output_folder: PathBuf::from(output_folder),
    })
}

fn text(message: &str, initial: Option<&str>) -> InputResult<String> {
    let text = Text::new(message);
    match initial {
        Some(value) => text.with_initial_value(value).prompt(),
        None => text.prompt(),
    }
}
