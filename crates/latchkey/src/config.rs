//! CLI-owned configuration: TOML file, environment overrides, and
//! translation to `latchkey_core::EngineConfig`.
//!
//! Core never sees these types -- it receives a pre-built `EngineConfig`.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use latchkey_core::EngineConfig;
use latchkey_core::config::DEFAULT_INDEX_SCAN_LIMIT;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── TOML config structs ──────────────────────────────────────────────

/// CLI-owned TOML configuration. Core never touches this type.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Fleet snapshot used when --fleet is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fleet: Option<PathBuf>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_index_scan_limit")]
    pub index_scan_limit: u32,

    /// Compare and write PINs unless a command says otherwise.
    #[serde(default)]
    pub with_pin: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            index_scan_limit: default_index_scan_limit(),
            with_pin: false,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_index_scan_limit() -> u32 {
    DEFAULT_INDEX_SCAN_LIMIT
}

// ── Config file path ─────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "latchkey", "latchkey").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("latchkey");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ───────────────────────────────────────────────────

/// Load config from defaults, the TOML file and `LATCHKEY_` env vars, in
/// rising priority. Nested keys use a double underscore, e.g.
/// `LATCHKEY_DEFAULTS__INDEX_SCAN_LIMIT`.
pub fn load_config(path: &Path) -> Result<Config, CliError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LATCHKEY_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Resolution ───────────────────────────────────────────────────────

/// Effective settings for one invocation.
#[derive(Debug)]
pub struct Settings {
    pub fleet: PathBuf,
    pub output: OutputFormat,
    pub with_pin: bool,
    pub engine: EngineConfig,
}

/// Combine the loaded config with command-line flags. Flags win.
pub fn resolve(config: &Config, global: &GlobalOpts) -> Result<Settings, CliError> {
    let fleet = global
        .fleet
        .clone()
        .or_else(|| config.fleet.clone())
        .ok_or_else(|| CliError::NoFleet {
            path: config_file(global).display().to_string(),
        })?;

    let output = match &global.output {
        Some(format) => format.clone(),
        None => OutputFormat::from_str(&config.defaults.output, true).map_err(|reason| {
            CliError::Validation {
                field: "defaults.output".into(),
                reason,
            }
        })?,
    };

    if config.defaults.index_scan_limit == 0 {
        return Err(CliError::Validation {
            field: "defaults.index_scan_limit".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(Settings {
        fleet,
        output,
        with_pin: config.defaults.with_pin,
        engine: EngineConfig {
            index_scan_limit: config.defaults.index_scan_limit,
        },
    })
}

/// Config file for this invocation: --config, else the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}
