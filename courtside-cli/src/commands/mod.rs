//! CLI command implementations.

pub mod auth_header;
pub mod deliver;
pub mod keys;
pub mod send;

use courtside_push::{DeliveryReport, WebPushConfig};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::error::{CliError, CliResult};

/// Load push configuration from a TOML file, or from the environment.
pub fn load_config(path: Option<&Path>) -> CliResult<WebPushConfig> {
    let config = match path {
        Some(path) => WebPushConfig::from_toml_file(path)?,
        None => WebPushConfig::from_env()?,
    };
    Ok(config)
}

/// Read and parse a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Print a delivery report as JSON on stdout, with a summary on stderr.
pub fn print_report(report: &DeliveryReport) -> CliResult<()> {
    use colored::Colorize;

    println!("{}", serde_json::to_string_pretty(report)?);

    let summary = format!("{} sent, {} failed", report.sent, report.failed);
    if report.failed == 0 {
        eprintln!("\n  {} {}\n", "✓".green(), summary);
    } else {
        eprintln!("\n  {} {}\n", "!".yellow().bold(), summary);
    }
    Ok(())
}
