//! Clap derive structures for the `jablonet` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// jablonet -- read and switch a Jablotron alarm panel through JabloNET
#[derive(Debug, Parser)]
#[command(
    name = "jablonet",
    version,
    about = "Monitor and control Jablotron alarm panels from the command line",
    long_about = "Polls thermometers, sections, detectors and programmable outputs\n\
        of a Jablotron panel through the JabloNET web service, and switches\n\
        programmable outputs (PGM) with your control code.",
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
    /// Account profile to use
    #[arg(long, short = 'p', env = "JABLONET_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Account login (overrides profile)
    #[arg(long, short = 'u', env = "JABLONET_USERNAME", global = true)]
    pub username: Option<String>,

    /// Service id selecting one panel (overrides profile)
    #[arg(long, env = "JABLONET_SERVICE_ID", global = true)]
    pub service_id: Option<String>,

    /// JabloNET service root (overrides profile)
    #[arg(long, env = "JABLONET_BASE_URL", global = true, hide_env = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "JABLONET_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Per-request timeout in seconds
    #[arg(long, env = "JABLONET_TIMEOUT", global = true,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Cooldown after a failed re-login, in seconds
    #[arg(long, env = "JABLONET_RETRY_COOLDOWN", global = true)]
    pub retry_cooldown: Option<u64>,
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
    /// Show the state of every point on the panel
    #[command(alias = "st")]
    Status(StatusArgs),

    /// List and switch programmable outputs
    Pgm(PgmArgs),

    /// Check that the configured credentials can log in
    Login,

    /// Poll the panel at a fixed interval
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATUS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Only show one category (e.g. "thermometers", "outputs", "pgm")
    #[arg(long, short = 'c')]
    pub category: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PGM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PgmArgs {
    #[command(subcommand)]
    pub command: PgmCommand,
}

#[derive(Debug, Subcommand)]
pub enum PgmCommand {
    /// List programmable outputs
    #[command(alias = "ls")]
    List,

    /// Switch an output on
    On(SwitchArgs),

    /// Switch an output off
    Off(SwitchArgs),
}

#[derive(Debug, Args)]
pub struct SwitchArgs {
    /// Output id as shown by `pgm list`
    pub id: String,

    /// Control code (prompted for when not configured)
    #[arg(long)]
    pub code: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between polls
    #[arg(long, short = 'i', default_value = "60",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Stop after this many polls
    #[arg(long, short = 'n')]
    pub count: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the account password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },

    /// Store the PGM control code in the system keyring
    SetCode {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
