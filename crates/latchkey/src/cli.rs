//! Clap derive structures for the `latchkey` CLI.
//!
//! Defines the command tree, global flags, and shared types. Only depends
//! on clap so the build script can render man pages from it.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// latchkey -- card permission reconciliation for door controllers
#[derive(Debug, Parser)]
#[command(
    name = "latchkey",
    version,
    about = "Reconcile card permissions across door controllers",
    long_about = "Reads, diffs and writes the card tables of a fleet of door controllers.\n\n\
        The fleet is a JSON snapshot file; every write is saved back to it.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "LATCHKEY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Fleet snapshot file
    #[arg(long, short = 'f', env = "LATCHKEY_FLEET", global = true)]
    pub fleet: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(long, short = 'o', env = "LATCHKEY_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List controllers and their door names
    #[command(alias = "dev", alias = "d")]
    Devices,

    /// Read, diff and apply fleet-wide card tables
    Acl(AclArgs),

    /// Look up, grant or revoke a single card by door name
    Card(CardArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── ACL ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AclArgs {
    #[command(subcommand)]
    pub command: AclCommand,
}

#[derive(Debug, Subcommand)]
pub enum AclCommand {
    /// Read every card from every controller
    Get,

    /// Diff a desired ACL file against the controllers
    #[command(alias = "diff")]
    Compare {
        /// Desired ACL (JSON, as printed by `acl get -o json`)
        #[arg(long, short = 'd')]
        desired: PathBuf,

        /// Treat a PIN change as a difference
        #[arg(long)]
        with_pin: bool,
    },

    /// Bring the controllers to a desired ACL
    Put {
        /// Desired ACL (JSON, as printed by `acl get -o json`)
        #[arg(long, short = 'd')]
        desired: PathBuf,

        /// Report what would change without writing anything
        #[arg(long, short = 'n')]
        dry_run: bool,

        /// Write cards whose only difference is the PIN
        #[arg(long)]
        with_pin: bool,
    },

    /// Delete every card from every controller
    Clear,
}

// ── Card ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CardArgs {
    #[command(subcommand)]
    pub command: CardCommand,
}

#[derive(Debug, Subcommand)]
pub enum CardCommand {
    /// Show a card's access per door
    Get {
        /// Card number
        card: u32,
    },

    /// Open doors for a card
    Grant {
        /// Card number
        card: u32,

        /// First valid day (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// Last valid day (YYYY-MM-DD)
        #[arg(long)]
        to: String,

        /// Restrict the doors to a time profile (2-254)
        #[arg(long, short = 'p')]
        profile: Option<u8>,

        /// Door names, or ALL
        #[arg(required = true)]
        doors: Vec<String>,
    },

    /// Close doors for a card
    Revoke {
        /// Card number
        card: u32,

        /// Door names, or ALL
        #[arg(required = true)]
        doors: Vec<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
