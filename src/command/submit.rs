//! Clones a GitHub repository, instruments it and opens a pull request.
use log::*;

use crate::{
    CopilotError, Result, applier,
    command::common,
    config::Config,
    forge::{
        config::RemoteConfig,
        github::Github,
        pr,
        traits::Forge,
        types::{CreatePrRequest, PullRequest},
    },
    generator::{self, GeneratorOptions, TelemetryMode, resolve_mode},
    repo::Checkout,
    scanner::Language,
};

/// What the caller asked to submit.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub language: Language,
    pub mode: TelemetryMode,
    /// Detected service name when `None`.
    pub service: Option<String>,
    pub base_branch: String,
}

pub async fn execute(
    config: &Config,
    repo: String,
    language: Language,
    mode: TelemetryMode,
    service: Option<String>,
    base: Option<String>,
    github_token: String,
) -> Result<()> {
    let remote = RemoteConfig::from_github_url(&repo, &github_token)?;
    let forge = Github::new(remote)?;

    let request = SubmitRequest {
        language,
        mode,
        service,
        base_branch: base
            .unwrap_or_else(|| config.pull_request.base_branch.clone()),
    };

    let pr = submit(config, &forge, request).await?;

    info!("opened pull request #{}", pr.number);
    println!("{}", pr.url);

    Ok(())
}

/// Runs the full pipeline against the repository behind `forge`.
///
/// The checkout is removed on return whether or not the pipeline succeeded.
pub async fn submit(
    config: &Config,
    forge: &dyn Forge,
    request: SubmitRequest,
) -> Result<PullRequest> {
    let remote = forge.config();
    let language = request.language;

    let checkout_request = common::checkout_request(
        config,
        &format!("submit-{}", remote.repo),
        &remote.clone_url,
        Some(&request.base_branch),
        Some(remote.token.clone()),
    )?;
    let checkout = Checkout::materialize(checkout_request).await?;

    let scan = common::scanner(config).scan_path(checkout.path())?;
    let detection = scan.detection(language);

    let service = request
        .service
        .filter(|s| !s.trim().is_empty())
        .or_else(|| detection.map(|d| d.service_name.clone()))
        .unwrap_or_else(|| language.default_service_name().to_string());

    let (has_metrics, has_tracing) = detection
        .map(|d| (d.has_metrics, d.has_tracing))
        .unwrap_or_default();

    let mode = resolve_mode(&service, request.mode, has_metrics, has_tracing)?;

    if mode == TelemetryMode::None {
        return Err(CopilotError::InvalidArgs(
            "mode none produces no changes to submit".into(),
        ));
    }

    let plan = generator::generate(
        language,
        &service,
        mode,
        detection.map(|d| d.framework.as_str()),
        &scan.candidates_for(language),
        &GeneratorOptions::from(&config.generate),
    )?;

    let branch = pr::branch_name(mode);
    checkout.create_branch(branch)?;
    checkout.switch_branch(branch)?;

    let report = applier::apply(checkout.path(), &plan)?;

    if !report.changed() {
        return Err(CopilotError::AlreadySatisfied {
            service,
            mode: mode.to_string(),
        });
    }

    checkout.add_all()?;
    checkout.commit(
        pr::commit_message(mode),
        &config.pull_request.author_name,
        &config.pull_request.author_email,
    )?;
    checkout.push_branch(branch, &remote.token)?;

    forge
        .create_pr(CreatePrRequest {
            head_branch: branch.to_string(),
            base_branch: request.base_branch,
            title: pr::pr_title(&plan),
            body: pr::pr_body(&plan, &report),
        })
        .await
}
