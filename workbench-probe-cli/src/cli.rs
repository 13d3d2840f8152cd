//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// workbench-probe -- verify that a notebook workbench pod is actually usable.
///
/// Use `workbench-probe <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "workbench-probe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the workbench-probe.toml configuration file.
    #[arg(short, long, global = true, default_value = "workbench-probe.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify that packages import inside a workbench container.
    Verify(VerifyArgs),

    /// Wait for a workbench pod to become Ready.
    Wait(WaitArgs),

    /// Run functional snippet checks inside a workbench container.
    Check(CheckArgs),

    /// Compare auth sidecar resources against notebook annotations.
    Resources(ResourcesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

/// Where the workbench lives.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Namespace of the workbench pod (default: `[cluster].namespace`).
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Pod name, or container name with `--docker`.
    #[arg(short, long)]
    pub pod: String,

    /// Use a local Docker container named by `--pod` instead of a cluster pod.
    #[arg(long)]
    pub docker: bool,
}

// ---- verify ----

/// Verify package imports inside a container.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Container to exec into (default: the pod name).
    #[arg(long)]
    pub container: Option<String>,

    /// Comma separated package names (e.g. `numpy,pandas`).
    #[arg(long, value_delimiter = ',', required = true)]
    pub packages: Vec<String>,

    /// Per-package timeout in seconds (default: `[verification].package_timeout_secs`).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip container log collection for failed packages.
    #[arg(long)]
    pub no_diagnostics: bool,

    /// Interpreter used for the import command (default: `[verification].runtime`).
    #[arg(long)]
    pub runtime: Option<String>,
}

// ---- wait ----

/// Wait until the pod exists and reports Ready.
#[derive(Args, Debug)]
pub struct WaitArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Readiness timeout in seconds (default: `[readiness].timeout_secs`).
    #[arg(long)]
    pub timeout: Option<u64>,
}

// ---- check ----

/// Run snippet checks against a container.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Container to exec into (default: the pod name).
    #[arg(long)]
    pub container: Option<String>,

    /// Snippet suite (standard, data-science, all).
    #[arg(long, default_value = "standard")]
    pub suite: String,

    /// Overall time budget in seconds (default: `[verification].overall_timeout_secs`).
    #[arg(long)]
    pub overall_timeout: Option<u64>,
}

// ---- resources ----

/// Check the auth sidecar's resource requests and limits.
#[derive(Args, Debug)]
pub struct ResourcesArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Notebook annotation as `key=value`; repeat for each field.
    #[arg(short, long = "annotation", value_name = "KEY=VALUE", required = true)]
    pub annotations: Vec<String>,
}

// ---- config ----

/// Manage workbench-probe configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, cluster, readiness, verification).
        #[arg(long)]
        section: Option<String>,
    },
}
