//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use chrono::NaiveDate;

use latchkey_core::{Acl, Device, DeviceId, DoorAccess};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a desired ACL file.
pub fn read_acl_file(path: &Path) -> Result<Acl, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Parse a `YYYY-MM-DD` date flag.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, CliError> {
    value.trim().parse().map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("expected YYYY-MM-DD, got '{value}' ({e})"),
    })
}

pub fn device_ids(devices: &[Device]) -> Vec<DeviceId> {
    devices.iter().map(|d| d.id).collect()
}

pub fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".into(), |d| d.to_string())
}

/// Human-readable door access for tables.
pub fn fmt_access(access: Option<DoorAccess>) -> String {
    match access {
        Some(DoorAccess::Denied) => "no".into(),
        Some(DoorAccess::Always) => "yes".into(),
        Some(DoorAccess::Profile(id)) => format!("profile {id}"),
        Some(DoorAccess::Reserved) | None => "-".into(),
    }
}

pub fn fmt_cards(cards: &[u32]) -> String {
    if cards.is_empty() {
        return "-".into();
    }
    cards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print collected errors as warnings on stderr. Fails with
/// `CliError::Partial` if there were any, so the exit code reflects them
/// after the rest of the output has been printed.
pub fn report_errors<E: std::fmt::Display>(errors: &[E]) -> Result<(), CliError> {
    if errors.is_empty() {
        return Ok(());
    }
    for e in errors {
        eprintln!("warning: {e}");
    }
    Err(CliError::Partial {
        count: errors.len(),
    })
}
