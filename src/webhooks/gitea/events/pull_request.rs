use serde::Deserialize;

use crate::webhooks::gitea::events::{GiteaUser, Repository};

/// Shared by `pull_request`, `pull_request_approved`, `pull_request_rejected` and
/// `pull_request_comment` hooks, the sub-action lives in `action`.
#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    #[serde(default)]
    pub secret: String,
    pub action: String,
    pub pull_request: PullRequest,
    pub repository: Repository,
    pub sender: GiteaUser,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    pub head: PrBranchInfo,
    pub assignee: Option<GiteaUser>,
}

#[derive(Debug, Deserialize)]
pub struct PrBranchInfo {
    /// Branch name
    pub label: String,
    pub repo: Option<Repository>,
}

impl PullRequest {
    /// `<head-repo>/<head-branch>`, the branch the PR is merged from.
    pub fn source(&self) -> String {
        match &self.head.repo {
            Some(repo) => format!("{}/{}", repo.full_name, self.head.label),
            None => self.head.label.clone(),
        }
    }
}
