//! CLI argument parsing.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::{
    config::DEFAULT_CONFIG_FILE, generator::TelemetryMode, scanner::Language,
};

/// Global CLI arguments.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, default_value_t = false, global = true)]
    /// Enable debug logging.
    pub debug: bool,

    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    /// Path to the copilot configuration file.
    pub config: PathBuf,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect languages, frameworks and existing metrics/tracing usage.
    Scan {
        #[arg(long, required_unless_present = "path", conflicts_with = "path")]
        /// Repository URL or local git path to clone and scan.
        repo: Option<String>,

        #[arg(long, requires = "repo")]
        /// Branch to scan (remote default branch when omitted).
        branch: Option<String>,

        #[arg(long, requires = "repo")]
        /// Identifier for the scratch checkout.
        id: Option<String>,

        #[arg(long)]
        /// Existing working tree to scan in place.
        path: Option<PathBuf>,

        #[arg(long)]
        /// Write the scan result JSON to this file instead of stdout.
        out_file: Option<String>,
    },

    /// Generate an instrumentation plan.
    Plan {
        #[arg(long)]
        /// Target language (go, python, java, node).
        language: Language,

        #[arg(long)]
        /// Service name used in generated code.
        service: String,

        #[arg(long)]
        /// Telemetry mode: metrics, traces, both or none.
        mode: TelemetryMode,

        #[arg(long)]
        /// Scan result JSON used for candidates and mode narrowing.
        scan: Option<PathBuf>,

        #[arg(long)]
        /// Write the plan JSON to this file instead of stdout.
        out_file: Option<String>,
    },

    /// Apply a plan to a working tree.
    Apply {
        #[arg(long)]
        /// Working tree root.
        path: PathBuf,

        #[arg(long)]
        /// Plan JSON file.
        plan: PathBuf,
    },

    /// Render the deployment toggle spec for a service.
    ToggleSpec {
        #[arg(long)]
        service: String,

        #[arg(long)]
        mode: TelemetryMode,
    },

    /// Scan, generate, apply and open a pull request against GitHub.
    Submit {
        #[arg(long)]
        /// GitHub repository URL (https://github.com/owner/repo).
        repo: String,

        #[arg(long)]
        language: Language,

        #[arg(long)]
        mode: TelemetryMode,

        #[arg(long)]
        /// Service name (detected service name when omitted).
        service: Option<String>,

        #[arg(long)]
        /// Base branch for the pull request (config default when omitted).
        base: Option<String>,

        #[arg(long, default_value = "")]
        /// GitHub personal access token. Falls back to GITHUB_TOKEN env var.
        github_token: String,
    },
}
