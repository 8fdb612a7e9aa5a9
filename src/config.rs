use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO Error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("Missing configuration value: {key}")]
    Missing { key: &'static str },
}

/// Everything the session needs from the environment, loaded once at
/// startup and passed around explicitly.
#[derive(Debug, PartialEq, Clone)]
pub struct Config {
    pub subdomain: String,
    pub account_id: String,
    pub access_token: String,
    pub output_folder: PathBuf,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_values(&parse(&text))
    }

    pub fn from_values(
        values: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            subdomain: required(values, "SUBDOMAIN")?,
            account_id: required(values, "ACCOUNT_ID")?,
            access_token: required(values, "ACCESS_TOKEN")?,
            output_folder: PathBuf::from(required(values, "OUTPUT_FOLDER")?),
        })
    }

    pub fn render(&self) -> String {
        format!(
            "SUBDOMAIN={}\nACCOUNT_ID={}\nACCESS_TOKEN={}\nOUTPUT_FOLDER={}\n",
            quoted(&self.subdomain),
            quoted(&self.account_id),
            quoted(&self.access_token),
            quoted(&self.output_folder.display().to_string()),
        )
    }

    /// Write the file via a sibling and rename, so an interrupted save
    /// never leaves a half-written config behind.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let updated = path.with_extension("updated");
        fs::write(&updated, self.render())?;
        fs::rename(updated, path)?;
        Ok(())
    }
}

/// Values already on disk, regardless of completeness. Used to pre-fill
/// the wizard; an unreadable file just means nothing to pre-fill.
pub fn read_partial(path: &Path) -> HashMap<String, String> {
    fs::read_to_string(path)
        .map(|text| parse(&text))
        .unwrap_or_default()
}

fn parse(text: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            values.insert(
                key.trim().to_string(),
                unquote(value.trim()).to_string(),
            );
        }
    }
    values
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn quoted(value: &str) -> String {
    if value.is_empty() || value.contains(char::is_whitespace) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

fn required(
    values: &HashMap<String, String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    values
        .get(key)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or(ConfigError::Missing { key })
}
