//! Configuration loading and parsing for `copilot.toml` files.
//!
//! Every table is optional; missing tables and fields fall back to defaults.
use log::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Result;

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "copilot.toml";
/// Default timeout applied to repository clones.
pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 120;
/// Default clone depth. Zero fetches full history.
pub const DEFAULT_CLONE_DEPTH: u32 = 1;
/// Default OTLP collector endpoint written into generated tracing code.
pub const DEFAULT_COLLECTOR_ENDPOINT: &str =
    "otel-collector.observability.svc.cluster.local:4317";
/// Default port for stand-alone metrics exposition servers.
pub const DEFAULT_METRICS_PORT: u16 = 9464;
/// Default base branch for instrumentation pull requests.
pub const DEFAULT_BASE_BRANCH: &str = "main";

/// Repository retrieval and scanning settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Seconds before a clone is abandoned.
    pub clone_timeout_secs: u64,
    /// Clone depth (0 = full history).
    pub clone_depth: u32,
    /// Parent directory for disposable checkouts (default: system temp).
    pub scratch_dir: Option<PathBuf>,
    /// Extra directory names never descended into.
    pub skip_dirs: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            clone_timeout_secs: DEFAULT_CLONE_TIMEOUT_SECS,
            clone_depth: DEFAULT_CLONE_DEPTH,
            scratch_dir: None,
            skip_dirs: vec![],
        }
    }
}

/// Plan generation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// OTLP gRPC endpoint used by generated tracer providers.
    pub collector_endpoint: String,
    /// Port used by generated stand-alone metrics servers.
    pub metrics_port: u16,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            collector_endpoint: DEFAULT_COLLECTOR_ENDPOINT.into(),
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

/// Pull request submission settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PullRequestConfig {
    /// Branch the instrumentation PR targets.
    pub base_branch: String,
    /// Commit author name.
    pub author_name: String,
    /// Commit author email.
    pub author_email: String,
}

impl Default for PullRequestConfig {
    fn default() -> Self {
        Self {
            base_branch: DEFAULT_BASE_BRANCH.into(),
            author_name: "observability-copilot".into(),
            author_email: "observability-copilot@users.noreply.github.com"
                .into(),
        }
    }
}

/// Root configuration structure for `copilot.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub generate: GenerateConfig,
    pub pull_request: PullRequestConfig,
}

impl Config {
    /// Loads configuration from `path`, returning defaults when the file does
    /// not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "configuration file {} not found: using default config",
                path.display()
            );
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.scan.clone_timeout_secs == 0 {
            return Err(crate::CopilotError::invalid_config(
                "scan.clone_timeout_secs must be greater than zero",
            ));
        }

        if self.generate.collector_endpoint.trim().is_empty() {
            return Err(crate::CopilotError::invalid_config(
                "generate.collector_endpoint must not be empty",
            ));
        }

        Ok(())
    }
}
