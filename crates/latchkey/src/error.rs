//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use latchkey_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const DEVICE: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Controllers ──────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(
        code(latchkey::device),
        help("Check that the controller is powered and reachable, then retry.")
    )]
    Device { message: String },

    #[error("Controller {device} declined to store card {card}")]
    #[diagnostic(
        code(latchkey::declined),
        help("The controller may be full or the card number may be invalid for it.")
    )]
    Declined { device: String, card: u32 },

    #[error("{count} controller error(s) reported")]
    #[diagnostic(
        code(latchkey::partial),
        help("Results for the other controllers were applied. Fix the errors above and re-run.")
    )]
    Partial { count: usize },

    // ── Doors & cards ────────────────────────────────────────────────

    #[error("Door name '{name}' is ambiguous")]
    #[diagnostic(
        code(latchkey::ambiguous_door),
        help(
            "{first} and {second} both match.\n\
             Rename one of them on its controller; names are compared without case or spaces."
        )
    )]
    AmbiguousDoor {
        name: String,
        first: String,
        second: String,
    },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(latchkey::not_found),
        help("Run: latchkey {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Time profile {profile} is not defined on controller {device}")]
    #[diagnostic(
        code(latchkey::time_profile),
        help("Create the profile on the controller first, or grant without --profile.")
    )]
    TimeProfileNotDefined { device: String, profile: u8 },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(latchkey::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("No fleet snapshot configured")]
    #[diagnostic(
        code(latchkey::no_fleet),
        help(
            "Pass --fleet <path>, set LATCHKEY_FLEET, or set `fleet` in {path}"
        )
    )]
    NoFleet { path: String },

    #[error("Fleet snapshot {path} not found")]
    #[diagnostic(
        code(latchkey::fleet_missing),
        help("Check the path passed with --fleet or set in the config file.")
    )]
    FleetMissing { path: String },

    #[error(transparent)]
    #[diagnostic(code(latchkey::config))]
    Config(Box<figment::Error>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(latchkey::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in {path}: {source}")]
    #[diagnostic(code(latchkey::json), help("Check the file contents and try again."))]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not render output: {0}")]
    #[diagnostic(code(latchkey::render))]
    Render(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(latchkey::internal))]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Device { .. } | Self::Declined { .. } => exit_code::DEVICE,
            Self::NotFound { .. }
            | Self::TimeProfileNotDefined { .. }
            | Self::FleetMissing { .. } => exit_code::NOT_FOUND,
            Self::AmbiguousDoor { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Fleet(_) | CoreError::Device { .. } | CoreError::IncompleteFetch { .. } => {
                CliError::Device {
                    message: err.to_string(),
                }
            }

            CoreError::Rejected { device, card } => CliError::Declined {
                device: device.to_string(),
                card,
            },

            CoreError::AmbiguousDoor {
                name,
                first,
                second,
                ..
            } => CliError::AmbiguousDoor {
                name,
                first,
                second,
            },

            CoreError::UnknownDoor { name } => CliError::NotFound {
                resource_type: "door".into(),
                identifier: name,
                list_command: "devices".into(),
            },

            CoreError::TimeProfileNotDefined { device, profile } => {
                CliError::TimeProfileNotDefined {
                    device: device.to_string(),
                    profile,
                }
            }

            CoreError::InvalidCard { card, reason } => CliError::Validation {
                field: format!("card {card}"),
                reason,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
