//! Pull request publishing client
//!
//! Drives the GitHub REST flow for one file rewrite: resolve the base
//! branch, create (or detect) the update branch, push the new file content
//! and open the pull request.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::config::PrStrategy;
use crate::github::packages::build_client;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Branch {0} already exists")]
    BranchExists(String),

    #[error("Open PR already exists for branch {branch}: {url}")]
    OpenPrExists { branch: String, url: String },

    #[error("Failed to create branch {branch}: {reason}")]
    BranchCreationFailed { branch: String, reason: String },

    #[error("Failed to update file {path}: {reason}")]
    UpdateFailed { path: String, reason: String },

    #[error("Failed to create PR: {0}")]
    CreationFailed(String),
}

/// Everything needed to open one pull request rewriting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestSpec {
    /// Target repository (`owner/repo`)
    pub repository: String,
    /// Path of the rewritten file inside the repository
    pub file_path: String,
    pub new_content: String,
    pub branch_name: String,
    pub title: String,
    pub body: String,
    pub base_branch: String,
}

/// Trait for publishing a file rewrite as a pull request.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PullRequestPublisher: Send + Sync {
    /// Opens the pull request and returns its HTML URL.
    async fn create_pull_request(&self, spec: &PullRequestSpec) -> Result<String, PublishError>;
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct FileContents {
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct PullItem {
    html_url: String,
}

/// Client for the GitHub pulls, refs and contents APIs.
pub struct GitHubPullsClient {
    client: reqwest::Client,
    base_url: String,
    strategy: PrStrategy,
}

impl GitHubPullsClient {
    pub fn new(base_url: &str, token: &str, strategy: PrStrategy) -> Self {
        Self {
            client: build_client(token),
            base_url: base_url.to_string(),
            strategy,
        }
    }

    async fn base_sha(&self, repository: &str, base_branch: &str) -> Result<String, PublishError> {
        let url = format!(
            "{}/repos/{}/git/ref/heads/{}",
            self.base_url, repository, base_branch
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(PublishError::CreationFailed(format!(
                "cannot resolve base branch {base_branch}: {}",
                response.status()
            )));
        }
        let git_ref: GitRef = response
            .json()
            .await
            .map_err(|e| PublishError::CreationFailed(e.to_string()))?;
        Ok(git_ref.object.sha)
    }

    async fn branch_exists(&self, repository: &str, branch: &str) -> Result<bool, PublishError> {
        let url = format!(
            "{}/repos/{}/git/ref/heads/{}",
            self.base_url, repository, branch
        );
        let exists = self.client.get(&url).send().await?.status().is_success();
        if exists {
            debug!("branch {branch} already exists");
        } else {
            debug!("branch {branch} does not exist, will create it");
        }
        Ok(exists)
    }

    /// Fails when an open PR already targets the base branch from `branch`.
    async fn ensure_no_open_pull(
        &self,
        repository: &str,
        branch: &str,
        base_branch: &str,
    ) -> Result<(), PublishError> {
        let owner = repository.split('/').next().unwrap_or_default();
        let head = format!("{owner}:{branch}");
        let url = format!("{}/repos/{}/pulls", self.base_url, repository);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("state", "open"),
                ("head", head.as_str()),
                ("base", base_branch),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            debug!("no open PR found for branch {branch}");
            return Ok(());
        }
        let pulls: Vec<PullItem> = response.json().await.unwrap_or_default();
        match pulls.into_iter().next() {
            Some(pull) => Err(PublishError::OpenPrExists {
                branch: branch.to_string(),
                url: pull.html_url,
            }),
            None => Ok(()),
        }
    }

    async fn create_branch(
        &self,
        repository: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), PublishError> {
        let url = format!("{}/repos/{}/git/refs", self.base_url, repository);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "ref": format!("refs/heads/{branch}"), "sha": sha }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PublishError::BranchCreationFailed {
                branch: branch.to_string(),
                reason: format!("status {}", response.status()),
            });
        }
        debug!("created branch {branch}");
        Ok(())
    }

    async fn update_file(&self, spec: &PullRequestSpec) -> Result<(), PublishError> {
        let url = format!(
            "{}/repos/{}/contents/{}",
            self.base_url, spec.repository, spec.file_path
        );

        let response = self
            .client
            .get(&url)
            .query(&[("ref", &spec.branch_name)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PublishError::UpdateFailed {
                path: spec.file_path.clone(),
                reason: format!("cannot fetch current contents: {}", response.status()),
            });
        }
        let contents: FileContents =
            response.json().await.map_err(|e| PublishError::UpdateFailed {
                path: spec.file_path.clone(),
                reason: e.to_string(),
            })?;

        // the contents API wraps base64 at 60 columns
        let encoded: String = contents.content.split_whitespace().collect();
        let original = BASE64
            .decode(&encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| PublishError::UpdateFailed {
                path: spec.file_path.clone(),
                reason: "current contents are not valid base64 UTF-8".to_string(),
            })?;

        let new_content = match_trailing_newline(&original, &spec.new_content);

        debug!(
            "updating file {} in branch {}",
            spec.file_path, spec.branch_name
        );
        let response = self
            .client
            .put(&url)
            .json(&json!({
                "message": format!("Update {}", spec.file_path),
                "content": BASE64.encode(new_content.as_bytes()),
                "sha": contents.sha,
                "branch": spec.branch_name,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PublishError::UpdateFailed {
                path: spec.file_path.clone(),
                reason: format!("status {}", response.status()),
            });
        }
        Ok(())
    }

    async fn open_pull(&self, spec: &PullRequestSpec) -> Result<String, PublishError> {
        debug!("opening pull request {}", spec.title);
        let url = format!("{}/repos/{}/pulls", self.base_url, spec.repository);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "title": spec.title,
                "body": spec.body,
                "head": spec.branch_name,
                "base": spec.base_branch,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PublishError::CreationFailed(format!(
                "status {}",
                response.status()
            )));
        }
        let pull: PullItem = response
            .json()
            .await
            .map_err(|e| PublishError::CreationFailed(e.to_string()))?;
        Ok(pull.html_url)
    }
}

#[async_trait]
impl PullRequestPublisher for GitHubPullsClient {
    async fn create_pull_request(&self, spec: &PullRequestSpec) -> Result<String, PublishError> {
        debug!(
            "creating PR in {} on branch {}",
            spec.repository, spec.branch_name
        );
        let base_sha = self.base_sha(&spec.repository, &spec.base_branch).await?;

        if self
            .branch_exists(&spec.repository, &spec.branch_name)
            .await?
        {
            // a leftover branch means the update PR was already attempted
            if self.strategy == PrStrategy::Separate {
                return Err(PublishError::BranchExists(spec.branch_name.clone()));
            }
            self.ensure_no_open_pull(&spec.repository, &spec.branch_name, &spec.base_branch)
                .await?;
        } else {
            self.create_branch(&spec.repository, &spec.branch_name, &base_sha)
                .await?;
        }

        self.update_file(spec).await?;
        self.open_pull(spec).await
    }
}

/// Keep the rewritten content's trailing newline consistent with the
/// file as it exists on the branch.
fn match_trailing_newline(original: &str, new_content: &str) -> String {
    let original_ends_with_newline = original.ends_with('\n');
    if original_ends_with_newline && !new_content.ends_with('\n') {
        format!("{new_content}\n")
    } else if !original_ends_with_newline && new_content.ends_with('\n') {
        new_content.trim_end_matches('\n').to_string()
    } else {
        new_content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use rstest::rstest;

    fn spec() -> PullRequestSpec {
        PullRequestSpec {
            repository: "owner/repo".to_string(),
            file_path: "dynamic-plugins.yaml".to_string(),
            new_content: "plugins: updated\n".to_string(),
            branch_name: "update-plugin-x-1.2.3".to_string(),
            title: "Update plugin-x".to_string(),
            body: "body".to_string(),
            base_branch: "main".to_string(),
        }
    }

    fn client_for(server: &Server, strategy: PrStrategy) -> GitHubPullsClient {
        GitHubPullsClient::new(&server.url(), "test-token", strategy)
    }

    #[rstest]
    #[case("plugins: old\n", "plugins: new", "plugins: new\n")]
    #[case("plugins: old", "plugins: new\n", "plugins: new")]
    #[case("plugins: old\n", "plugins: new\n", "plugins: new\n")]
    #[case("plugins: old", "plugins: new", "plugins: new")]
    fn match_trailing_newline_follows_the_original(
        #[case] original: &str,
        #[case] new_content: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(match_trailing_newline(original, new_content), expected);
    }

    #[tokio::test]
    async fn create_pull_request_runs_the_full_flow() {
        let mut server = Server::new_async().await;

        let base_ref = server
            .mock("GET", "/repos/owner/repo/git/ref/heads/main")
            .with_status(200)
            .with_body(r#"{"object": {"sha": "base-sha"}}"#)
            .create_async()
            .await;
        let branch_ref = server
            .mock("GET", "/repos/owner/repo/git/ref/heads/update-plugin-x-1.2.3")
            .with_status(404)
            .create_async()
            .await;
        let create_ref = server
            .mock("POST", "/repos/owner/repo/git/refs")
            .match_body(Matcher::PartialJson(json!({
                "ref": "refs/heads/update-plugin-x-1.2.3",
                "sha": "base-sha"
            })))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;
        let get_contents = server
            .mock("GET", "/repos/owner/repo/contents/dynamic-plugins.yaml")
            .match_query(Matcher::UrlEncoded(
                "ref".into(),
                "update-plugin-x-1.2.3".into(),
            ))
            .with_status(200)
            .with_body(
                json!({
                    "sha": "file-sha",
                    "content": BASE64.encode(b"plugins: old\n"),
                })
                .to_string(),
            )
            .create_async()
            .await;
        let put_contents = server
            .mock("PUT", "/repos/owner/repo/contents/dynamic-plugins.yaml")
            .match_body(Matcher::PartialJson(json!({
                "sha": "file-sha",
                "branch": "update-plugin-x-1.2.3",
                "content": BASE64.encode(b"plugins: updated\n"),
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let open_pull = server
            .mock("POST", "/repos/owner/repo/pulls")
            .match_body(Matcher::PartialJson(json!({
                "head": "update-plugin-x-1.2.3",
                "base": "main"
            })))
            .with_status(201)
            .with_body(r#"{"html_url": "https://github.com/owner/repo/pull/1"}"#)
            .create_async()
            .await;

        let url = client_for(&server, PrStrategy::Separate)
            .create_pull_request(&spec())
            .await
            .unwrap();

        base_ref.assert_async().await;
        branch_ref.assert_async().await;
        create_ref.assert_async().await;
        get_contents.assert_async().await;
        put_contents.assert_async().await;
        open_pull.assert_async().await;
        assert_eq!(url, "https://github.com/owner/repo/pull/1");
    }

    #[tokio::test]
    async fn separate_strategy_fails_when_branch_exists() {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/repos/owner/repo/git/ref/heads/main")
            .with_status(200)
            .with_body(r#"{"object": {"sha": "base-sha"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/owner/repo/git/ref/heads/update-plugin-x-1.2.3")
            .with_status(200)
            .with_body(r#"{"object": {"sha": "branch-sha"}}"#)
            .create_async()
            .await;

        let result = client_for(&server, PrStrategy::Separate)
            .create_pull_request(&spec())
            .await;

        assert!(matches!(result, Err(PublishError::BranchExists(_))));
    }

    #[tokio::test]
    async fn joint_strategy_fails_when_open_pull_exists() {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/repos/owner/repo/git/ref/heads/main")
            .with_status(200)
            .with_body(r#"{"object": {"sha": "base-sha"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/owner/repo/git/ref/heads/update-plugin-x-1.2.3")
            .with_status(200)
            .with_body(r#"{"object": {"sha": "branch-sha"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/owner/repo/pulls")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"html_url": "https://github.com/owner/repo/pull/7"}]"#)
            .create_async()
            .await;

        let result = client_for(&server, PrStrategy::Joint)
            .create_pull_request(&spec())
            .await;

        assert!(matches!(
            result,
            Err(PublishError::OpenPrExists { url, .. }) if url.ends_with("/pull/7")
        ));
    }

    #[tokio::test]
    async fn update_failure_is_reported_as_update_failed() {
        let mut server = Server::new_async().await;

        server
            .mock("GET", "/repos/owner/repo/git/ref/heads/main")
            .with_status(200)
            .with_body(r#"{"object": {"sha": "base-sha"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/owner/repo/git/ref/heads/update-plugin-x-1.2.3")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("POST", "/repos/owner/repo/git/refs")
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("GET", "/repos/owner/repo/contents/dynamic-plugins.yaml")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let result = client_for(&server, PrStrategy::Separate)
            .create_pull_request(&spec())
            .await;

        assert!(matches!(result, Err(PublishError::UpdateFailed { .. })));
    }
}
