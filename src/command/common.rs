//! Common functionality shared between commands
use log::*;
use secrecy::SecretString;
use serde::{Serialize, de::DeserializeOwned};
use std::{path::Path, time::Duration};
use tokio::fs;

use crate::{
    Result,
    config::Config,
    repo::CheckoutRequest,
    scanner::{ScanOptions, Scanner},
};

/// Builds a checkout request using the configured clone settings.
pub fn checkout_request(
    config: &Config,
    id: &str,
    location: &str,
    reference: Option<&str>,
    token: Option<SecretString>,
) -> Result<CheckoutRequest> {
    let mut builder = CheckoutRequest::builder();
    builder
        .id(id)
        .location(location)
        .depth(config.scan.clone_depth)
        .timeout(Duration::from_secs(config.scan.clone_timeout_secs));

    if let Some(reference) = reference {
        builder.reference(reference);
    }

    if let Some(scratch_dir) = &config.scan.scratch_dir {
        builder.scratch_dir(scratch_dir.clone());
    }

    if let Some(token) = token {
        builder.token(token);
    }

    builder.build()
}

pub fn scanner(config: &Config) -> Scanner {
    Scanner::new(ScanOptions {
        skip_dirs: config.scan.skip_dirs.clone(),
    })
}

/// Reads and deserializes a JSON document produced by another command.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("reading {}", path.display());
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Writes pretty JSON to `out_file` when given, otherwise prints it.
pub async fn write_json<T: Serialize>(
    value: &T,
    out_file: Option<String>,
) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;

    if let Some(out_file) = out_file {
        let file_path = Path::new(&out_file);

        if let Some(parent) = file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await?;
        }

        info!("writing json to: {}", file_path.display());
        fs::write(file_path, &content).await?;
    } else {
        println!("{content}");
    }

    Ok(())
}
