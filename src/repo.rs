//! Disposable repository checkouts.
//!
//! A [`Checkout`] owns a scratch directory created under a caller supplied id
//! and removes it when dropped, whatever the outcome of the scan that used
//! it. Cloning runs on a blocking thread under an overall timeout; the
//! blocking task keeps ownership of the directory until it finishes, so a
//! timed out clone is still cleaned up.
use derive_builder::Builder;
use git2::{ErrorClass, ErrorCode, RemoteCallbacks};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::TempDir;

use crate::{
    CopilotError, Result,
    config::{DEFAULT_CLONE_DEPTH, DEFAULT_CLONE_TIMEOUT_SECS},
};

/// Remote name used for pushes.
const ORIGIN_REMOTE: &str = "origin";

/// Username sent alongside a token for HTTPS auth.
const TOKEN_USER: &str = "x-access-token";

#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct CheckoutRequest {
    /// Caller supplied identifier, unique per concurrent checkout.
    pub id: String,
    /// Clone URL or local path.
    pub location: String,
    /// Branch to check out; the remote's default branch when unset.
    #[builder(setter(into, strip_option), default)]
    pub reference: Option<String>,
    /// Clone depth (0 = full history).
    #[builder(default = "DEFAULT_CLONE_DEPTH")]
    pub depth: u32,
    #[builder(default = "Duration::from_secs(DEFAULT_CLONE_TIMEOUT_SECS)")]
    pub timeout: Duration,
    /// Parent directory for the scratch checkout (default: system temp).
    #[builder(setter(into, strip_option), default)]
    pub scratch_dir: Option<PathBuf>,
    #[builder(setter(into, strip_option), default)]
    pub token: Option<SecretString>,
}

impl CheckoutRequestBuilder {
    pub fn build(&self) -> Result<CheckoutRequest> {
        let request = self.build_unchecked()?;

        if request.id.trim().is_empty() {
            return Err(CopilotError::InvalidArgs(
                "checkout id must not be empty".into(),
            ));
        }

        if request.id.contains(['/', '\\']) {
            return Err(CopilotError::InvalidArgs(format!(
                "checkout id must not contain path separators: {}",
                request.id
            )));
        }

        Ok(request)
    }

    fn build_unchecked(&self) -> Result<CheckoutRequest> {
        self._build().map_err(|e| {
            CopilotError::InvalidArgs(format!(
                "Failed to build checkout request: {}",
                e
            ))
        })
    }
}

impl CheckoutRequest {
    pub fn builder() -> CheckoutRequestBuilder {
        CheckoutRequestBuilder::default()
    }
}

/// Create Git authentication callbacks for username/token authentication.
fn get_auth_callbacks<'r>(user: String, token: String) -> RemoteCallbacks<'r> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username, _allowed| {
        git2::Cred::userpass_plaintext(&user, &token)
    });
    callbacks
}

/// Local, exclusively owned checkout of a repository ref.
pub struct Checkout {
    // Declared before `dir` so the repository handle closes before the
    // directory is removed.
    repo: git2::Repository,
    dir: TempDir,
}

impl std::fmt::Debug for Checkout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkout")
            .field("path", &self.dir.path())
            .finish()
    }
}

impl Checkout {
    /// Clones `request.location` into a fresh scratch directory.
    pub async fn materialize(request: CheckoutRequest) -> Result<Self> {
        let parent = request
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        std::fs::create_dir_all(&parent)?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", request.id))
            .tempdir_in(&parent)?;

        info!(
            "cloning {} (ref: {}) into {}",
            request.location,
            request.reference.as_deref().unwrap_or("default"),
            dir.path().display()
        );

        let location = request.location.clone();
        let timeout = request.timeout;

        let task = tokio::task::spawn_blocking(move || {
            clone_into(&request, dir.path()).map(|repo| (repo, dir))
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => {
                let (repo, dir) = joined??;
                info!("clone of {location} complete");
                Ok(Self { repo, dir })
            }
            Err(_) => {
                warn!("clone of {location} timed out after {timeout:?}");
                Err(CopilotError::CloneTimeout {
                    location,
                    seconds: timeout.as_secs(),
                })
            }
        }
    }

    /// Root of the working tree.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn create_branch(&self, branch: &str) -> Result<()> {
        info!("creating branch: {branch}");
        let head = self.repo.head()?;
        let commit = head.peel_to_commit()?;
        self.repo.branch(branch, &commit, true)?;
        Ok(())
    }

    pub fn switch_branch(&self, branch: &str) -> Result<()> {
        info!("switching to branch: {branch}");
        let ref_name = format!("refs/heads/{}", branch);
        let target_obj = self.repo.revparse_single(&ref_name)?;
        self.repo.checkout_tree(&target_obj, None)?;
        self.repo.set_head(&ref_name)?;
        Ok(())
    }

    pub fn add_all(&self) -> Result<()> {
        debug!("adding changed files to index");
        let mut index = self.repo.index()?;
        index.add_all(["."], git2::IndexAddOption::DEFAULT, None)?;
        index.write()?;
        Ok(())
    }

    /// Commits the index on top of HEAD as `name <email>`.
    pub fn commit(&self, msg: &str, name: &str, email: &str) -> Result<()> {
        debug!("committing changes with msg: {msg}");

        let mut index = self.repo.index()?;
        let oid = index.write_tree()?;
        let tree = self.repo.find_tree(oid)?;
        let parent_commit = self.repo.head()?.peel_to_commit()?;
        let committer = git2::Signature::now(name, email)?;

        self.repo.commit(
            Some("HEAD"),
            &committer,
            &committer,
            msg,
            &tree,
            &[&parent_commit],
        )?;

        Ok(())
    }

    pub fn push_branch(&self, branch: &str, token: &SecretString) -> Result<()> {
        info!("pushing branch {branch}");

        let callbacks = get_auth_callbacks(
            TOKEN_USER.into(),
            token.expose_secret().to_string(),
        );
        let mut push_opts = git2::PushOptions::default();
        push_opts.remote_callbacks(callbacks);

        let mut remote = self.repo.find_remote(ORIGIN_REMOTE)?;

        // + indicates "force" push
        let ref_spec = format!("+refs/heads/{branch}");
        remote.push(&[ref_spec], Some(&mut push_opts))?;

        Ok(())
    }
}

fn clone_into(request: &CheckoutRequest, path: &Path) -> Result<git2::Repository> {
    let mut fetch_options = git2::FetchOptions::new();
    if request.depth > 0 {
        fetch_options.depth(request.depth as i32);
    }
    if let Some(token) = &request.token {
        fetch_options.remote_callbacks(get_auth_callbacks(
            TOKEN_USER.into(),
            token.expose_secret().to_string(),
        ));
    }

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_options);

    if let Some(reference) = &request.reference {
        builder.branch(reference);
    }

    builder
        .clone(&request.location, path)
        .map_err(|err| map_clone_error(err, request))
}

/// Splits libgit2 clone failures into "remote unreachable" and "ref not
/// found".
fn map_clone_error(err: git2::Error, request: &CheckoutRequest) -> CopilotError {
    debug!(
        "clone failed: code={:?} class={:?}: {}",
        err.code(),
        err.class(),
        err.message()
    );

    if let Some(reference) = &request.reference
        && err.code() == ErrorCode::NotFound
        && err.class() == ErrorClass::Reference
    {
        return CopilotError::RefNotFound {
            reference: reference.clone(),
        };
    }

    let unreachable = matches!(
        err.class(),
        ErrorClass::Net
            | ErrorClass::Http
            | ErrorClass::Ssl
            | ErrorClass::Ssh
            | ErrorClass::Os
    ) || matches!(err.code(), ErrorCode::NotFound | ErrorCode::Auth);

    if unreachable {
        return CopilotError::unreachable(&request.location, err.message());
    }

    CopilotError::GitError(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::init_git_repo;

    fn request(location: &Path, reference: Option<&str>) -> CheckoutRequest {
        let mut builder = CheckoutRequest::builder();
        builder
            .id("scan-test")
            .location(location.display().to_string())
            .depth(0u32);
        if let Some(reference) = reference {
            builder.reference(reference);
        }
        builder.build().unwrap()
    }

    #[test]
    fn builder_rejects_invalid_ids() {
        let result = CheckoutRequest::builder()
            .id("../escape")
            .location("https://github.com/acme/api")
            .build();
        assert!(matches!(result, Err(CopilotError::InvalidArgs(_))));

        let result = CheckoutRequest::builder().id("ok").build();
        assert!(matches!(result, Err(CopilotError::InvalidArgs(_))));
    }

    #[test]
    fn builder_applies_defaults() {
        let request = CheckoutRequest::builder()
            .id("abc")
            .location("https://github.com/acme/api")
            .build()
            .unwrap();
        assert_eq!(request.depth, DEFAULT_CLONE_DEPTH);
        assert_eq!(
            request.timeout,
            Duration::from_secs(DEFAULT_CLONE_TIMEOUT_SECS)
        );
        assert!(request.reference.is_none());
    }

    #[tokio::test]
    async fn clones_branch_and_removes_directory_on_drop() {
        let (source, branch) = init_git_repo(&[("main.go", "package main\n")]);

        let checkout = Checkout::materialize(request(source.path(), Some(&branch)))
            .await
            .unwrap();
        let path = checkout.path().to_path_buf();

        assert!(path.join("main.go").is_file());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("scan-test-")
        );

        drop(checkout);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_reference_is_ref_not_found() {
        let (source, _) = init_git_repo(&[("app.py", "print('hi')\n")]);

        let result =
            Checkout::materialize(request(source.path(), Some("no-such-branch")))
                .await;

        assert!(matches!(result, Err(CopilotError::RefNotFound { .. })));
    }

    #[tokio::test]
    async fn missing_repository_is_unreachable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("does-not-exist");

        let result = Checkout::materialize(request(&missing, None)).await;

        assert!(matches!(
            result,
            Err(CopilotError::RemoteUnreachable { .. })
        ));
    }

    #[tokio::test]
    async fn commits_on_new_branch() {
        let (source, _) = init_git_repo(&[("main.go", "package main\n")]);
        let checkout = Checkout::materialize(request(source.path(), None))
            .await
            .unwrap();

        checkout.create_branch("feat/add-observability").unwrap();
        checkout.switch_branch("feat/add-observability").unwrap();
        std::fs::write(checkout.path().join("metrics.go"), "package main\n")
            .unwrap();
        checkout.add_all().unwrap();
        checkout
            .commit("feat: add metrics", "bot", "bot@example.com")
            .unwrap();

        let head = checkout.repo.head().unwrap();
        assert_eq!(head.shorthand(), Some("feat/add-observability"));
        let commit = head.peel_to_commit().unwrap();
        assert_eq!(commit.message(), Some("feat: add metrics"));
    }
}
