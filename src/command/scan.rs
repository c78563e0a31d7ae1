//! Scans a remote repository or a local working tree.
use log::*;
use std::path::PathBuf;

use crate::{
    CopilotError, Result, command::common, config::Config,
    scanner::ScanResult,
};

/// Checkout id used when the caller does not supply one.
pub const DEFAULT_SCAN_ID: &str = "obs-copilot-scan";

pub async fn execute(
    config: &Config,
    repo: Option<String>,
    branch: Option<String>,
    id: Option<String>,
    path: Option<PathBuf>,
    out_file: Option<String>,
) -> Result<()> {
    let result = run(config, repo, branch, id, path).await?;
    common::write_json(&result, out_file).await
}

pub async fn run(
    config: &Config,
    repo: Option<String>,
    branch: Option<String>,
    id: Option<String>,
    path: Option<PathBuf>,
) -> Result<ScanResult> {
    let scanner = common::scanner(config);

    let result = match (path, repo) {
        (Some(path), _) => {
            info!("scanning working tree {}", path.display());
            scanner.scan_path(&path)?
        }
        (None, Some(repo)) => {
            let id = id.unwrap_or_else(|| DEFAULT_SCAN_ID.to_string());
            let request = common::checkout_request(
                config,
                &id,
                &repo,
                branch.as_deref(),
                None,
            )?;
            scanner.scan(request).await.inspect_err(|err| {
                if err.is_retrieval() {
                    error!("unable to retrieve {repo}: check url, branch and access");
                }
            })?
        }
        (None, None) => {
            return Err(CopilotError::InvalidArgs(
                "must provide --repo or --path".into(),
            ));
        }
    };

    for detection in result.frameworks.iter() {
        info!(
            "{} ({}): metrics={} tracing={}",
            detection.language,
            detection.framework,
            detection.has_metrics,
            detection.has_tracing
        );
    }

    warn!(
        "detection is heuristic: review candidates before generating edits"
    );

    Ok(result)
}
