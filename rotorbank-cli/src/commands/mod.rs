//! CLI command implementations

pub mod account;
pub mod config;
pub mod doctor;
pub mod history;
pub mod logs;
pub mod money;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use dialoguer::Password;
use serde::Serialize;

use rotorbank_core::services::{EntryPoint, LoggingService};
use rotorbank_core::{AccountHandle, OperationResult, RotorbankContext};

pub const ENV_DIR: &str = "ROTORBANK_DIR";
pub const ENV_PASSWORD: &str = "ROTORBANK_PASSWORD";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_DIR) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".rotorbank"))
        .ok_or_else(|| anyhow!("Could not find home directory; set {}", ENV_DIR))
}

/// Open the data directory with the event log attached
pub fn open_context() -> Result<RotorbankContext> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    let context = RotorbankContext::new(&data_dir).context("Failed to open ledger directory")?;
    Ok(match get_logger() {
        Some(logger) => context.with_logger(logger),
        None => context,
    })
}

/// Get password from the flag, ROTORBANK_PASSWORD, or an interactive prompt
pub fn resolve_password(password_flag: Option<String>, prompt: &str) -> Result<String> {
    if let Some(p) = password_flag {
        return Ok(p);
    }

    if let Ok(p) = std::env::var(ENV_PASSWORD) {
        return Ok(p);
    }

    if atty::isnt(atty::Stream::Stdin) {
        bail!("No password given: use --password or set {}", ENV_PASSWORD);
    }
    let p = Password::new().with_prompt(prompt).interact()?;
    Ok(p)
}

/// Get a new password, asking twice when prompting
pub fn resolve_new_password(password_flag: Option<String>, prompt: &str) -> Result<String> {
    if let Some(p) = password_flag {
        return Ok(p);
    }

    if atty::isnt(atty::Stream::Stdin) {
        bail!("No new password given: use --new-password");
    }
    let p = Password::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;
    Ok(p)
}

/// Log in, resolving the password first
pub fn login(
    ctx: &mut RotorbankContext,
    identity: &str,
    password_flag: Option<String>,
) -> Result<rotorbank_core::domain::result::Result<AccountHandle>> {
    let password = resolve_password(password_flag, &format!("Password for {}", identity))?;
    Ok(ctx.bank.login(identity, &password))
}

/// Print the outcome of a core operation
///
/// With `json` the result is printed as an `OperationResult` envelope and a
/// failure exits with status 1. Otherwise `render` prints a success and a
/// failure is returned to `main`.
pub fn finish<T: Serialize>(
    result: rotorbank_core::domain::result::Result<T>,
    json: bool,
    render: impl FnOnce(&T),
) -> Result<()> {
    if json {
        let failed = result.is_err();
        let envelope = OperationResult::from(result);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        if failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    match result {
        Ok(data) => {
            render(&data);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
