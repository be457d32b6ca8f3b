//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// scaudit -- software composition analysis for multi-ecosystem projects.
///
/// Use `scaudit <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "scaudit", version, about, long_about = None)]
pub struct Cli {
    /// Path to the scaudit.toml configuration file.
    #[arg(short, long, default_value = "scaudit.toml")]
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
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan project dependencies for known vulnerabilities.
    Audit(AuditArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- audit ----

/// Detect package managers, resolve dependency trees and scan them.
///
/// Flags override the `[audit]` section of the configuration file.
#[derive(Args, Debug, Default)]
pub struct AuditArgs {
    /// Directories to scan (default: `audit.working_dirs` from config).
    pub paths: Vec<PathBuf>,

    /// Detect descriptors in subdirectories too.
    #[arg(short, long)]
    pub recursive: bool,

    /// Only scan these technologies (comma separated, e.g. npm,maven).
    #[arg(long, value_delimiter = ',')]
    pub technologies: Vec<String>,

    /// Directory name patterns to skip during detection (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Repository to resolve dependencies through.
    #[arg(long)]
    pub deps_repo: Option<String>,

    /// Ignore `.scaudit/projects/<tech>.yaml` resolver config files.
    #[arg(long)]
    pub ignore_config_file: bool,

    /// Pip requirements file name.
    #[arg(long)]
    pub requirements_file: Option<String>,

    /// Include every npm dependency in the applicability hints.
    #[arg(long)]
    pub third_party_applicability: bool,

    /// Only report issues that have a fixed version.
    #[arg(long)]
    pub fixable_only: bool,

    /// Minimum severity to report (low, medium, high, critical).
    #[arg(long)]
    pub min_severity: Option<String>,

    /// Run as a curation audit.
    #[arg(long)]
    pub curation: bool,

    /// Curation cache directory.
    #[arg(long)]
    pub curation_cache_dir: Option<PathBuf>,

    /// Scan request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Local vulnerability database directory.
    #[arg(long)]
    pub vuln_db: Option<PathBuf>,
}

// ---- config ----

/// Manage scaudit configuration.
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
        /// Show only a specific section (general, server, audit).
        #[arg(long)]
        section: Option<String>,
    },
}
