//! Configuration for the GitHub remote a pull request is opened against.
use git_url_parse::GitUrl;
use log::*;
use secrecy::SecretString;
use std::env;
use url::Url;

use crate::{CopilotError, Result};

/// Environment variable consulted when no token is given explicitly.
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Remote repository connection configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Remote forge host (e.g., "github.com").
    pub host: String,
    /// URL scheme (http or https).
    pub scheme: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Access token for API calls and pushes.
    pub token: SecretString,
    /// URL the repository is cloned from, without credentials.
    pub clone_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "".to_string(),
            scheme: "".to_string(),
            owner: "".to_string(),
            repo: "".to_string(),
            token: SecretString::from("".to_string()),
            clone_url: "".to_string(),
        }
    }
}

impl RemoteConfig {
    /// Parses a GitHub repository URL and resolves its token: `token` when
    /// non-empty, else a token embedded in the URL, else `GITHUB_TOKEN`.
    pub fn from_github_url(url: &str, token: &str) -> Result<Self> {
        let env_token = env::var(GITHUB_TOKEN_VAR).ok();
        Self::parse(url, token, env_token)
    }

    fn parse(url: &str, token: &str, env_token: Option<String>) -> Result<Self> {
        let parsed = GitUrl::parse(url)?;

        validate_scheme(&parsed.scheme)?;

        let mut resolved = token.to_string();

        if resolved.is_empty()
            && let Some(url_token) = parsed.token.clone()
        {
            debug!("using token embedded in repository url");
            resolved = url_token;
        }

        if resolved.is_empty()
            && let Some(env_token) = env_token
        {
            debug!("using token from {GITHUB_TOKEN_VAR}");
            resolved = env_token;
        }

        if resolved.is_empty() {
            return Err(CopilotError::InvalidArgs(format!(
                "must set a github token (--github-token or {GITHUB_TOKEN_VAR})"
            )));
        }

        let host = parsed.host.clone().ok_or_else(|| {
            CopilotError::InvalidRemoteUrl(format!("missing host: {url}"))
        })?;

        let owner = parsed.owner.clone().ok_or_else(|| {
            CopilotError::InvalidRemoteUrl(format!("missing owner: {url}"))
        })?;

        let scheme = parsed.scheme.to_string();
        let clone_url = format!("{scheme}://{host}/{owner}/{}.git", parsed.name);

        Ok(Self {
            host,
            scheme,
            owner,
            repo: parsed.name,
            token: SecretString::from(resolved),
            clone_url,
        })
    }

    /// Web link to pull request `number`.
    pub fn pull_request_url(&self, number: u64) -> Result<String> {
        let base = Url::parse(&format!("{}://{}/", self.scheme, self.host))?;
        let link = base.join(&format!(
            "{}/{}/pull/{number}",
            self.owner, self.repo
        ))?;
        Ok(link.to_string())
    }

    /// Base URI of the REST API for this host.
    pub fn api_base_uri(&self) -> String {
        if self.host == "github.com" {
            format!("{}://api.github.com", self.scheme)
        } else {
            // GitHub Enterprise Server
            format!("{}://{}/api/v3", self.scheme, self.host)
        }
    }
}

/// Validate repository URL uses HTTP or HTTPS scheme.
fn validate_scheme(scheme: &git_url_parse::Scheme) -> Result<()> {
    match scheme {
        git_url_parse::Scheme::Http | git_url_parse::Scheme::Https => Ok(()),
        other => Err(CopilotError::InvalidRemoteUrl(format!(
            "only http and https schemes are supported for repo urls, got {other}"
        ))),
    }
}
