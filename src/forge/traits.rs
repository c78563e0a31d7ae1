//! Traits related to remote git forges
use async_trait::async_trait;

use crate::{
    Result,
    forge::{
        config::RemoteConfig,
        types::{CreatePrRequest, PullRequest},
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Forge: Send + Sync {
    fn config(&self) -> &RemoteConfig;
    async fn create_pr(&self, req: CreatePrRequest) -> Result<PullRequest>;
}
