//! GitHub forge implementation.
use async_trait::async_trait;
use log::*;
use octocrab::Octocrab;

use crate::{
    Result,
    forge::{
        config::RemoteConfig,
        traits::Forge,
        types::{CreatePrRequest, PullRequest},
    },
};

/// GitHub forge implementation using Octocrab.
pub struct Github {
    config: RemoteConfig,
    instance: Octocrab,
}

impl Github {
    /// Create GitHub client with personal access token authentication and API
    /// base URL configuration.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let instance = Octocrab::builder()
            .personal_token(config.token.clone())
            .base_uri(config.api_base_uri())?
            .build()?;

        Ok(Self { config, instance })
    }
}

#[async_trait]
impl Forge for Github {
    fn config(&self) -> &RemoteConfig {
        &self.config
    }

    async fn create_pr(&self, req: CreatePrRequest) -> Result<PullRequest> {
        info!(
            "opening pull request {} -> {} on {}/{}",
            req.head_branch, req.base_branch, self.config.owner, self.config.repo
        );

        let pr = self
            .instance
            .pulls(&self.config.owner, &self.config.repo)
            .create(req.title, req.head_branch, req.base_branch)
            .body(req.body)
            .send()
            .await?;

        let url = match pr.html_url {
            Some(url) => url.to_string(),
            None => self.config.pull_request_url(pr.number)?,
        };

        Ok(PullRequest {
            number: pr.number,
            url,
        })
    }
}
