use serde::{Deserialize, Deserializer};

mod create;
mod delete;
mod fork;
mod issue_comment;
mod issues;
mod pull_request;
mod push;
mod release;
mod repository;

pub use create::*;
pub use delete::*;
pub use fork::*;
pub use issue_comment::*;
pub use issues::*;
pub use pull_request::*;
pub use push::*;
pub use release::*;
pub use repository::*;

/// A decoded Gitea webhook payload, one variant per payload schema.
#[derive(Debug)]
pub enum WebhookEvent {
    Create(CreateEvent),
    Delete(DeleteEvent),
    Fork(ForkEvent),
    IssueComment(IssueCommentEvent),
    Issues(IssuesEvent),
    PullRequest(PullRequestEvent),
    Push(PushEvent),
    Release(ReleaseEvent),
    Repository(RepositoryEvent),
}

impl WebhookEvent {
    /// Full name of the repository subscriptions are matched against.
    ///
    /// For forks this is the original repository, not the newly created fork.
    pub fn repository(&self) -> &str {
        match self {
            Self::Create(event) => &event.repository.full_name,
            Self::Delete(event) => &event.repository.full_name,
            Self::Fork(event) => &event.forkee.full_name,
            Self::IssueComment(event) => &event.repository.full_name,
            Self::Issues(event) => &event.repository.full_name,
            Self::PullRequest(event) => &event.repository.full_name,
            Self::Push(event) => &event.repository.full_name,
            Self::Release(event) => &event.repository.full_name,
            Self::Repository(event) => &event.repository.full_name,
        }
    }

    /// Token Gitea embedded in the payload, checked against each subscriber's issued token.
    pub fn secret(&self) -> &str {
        match self {
            Self::Create(event) => &event.secret,
            Self::Delete(event) => &event.secret,
            Self::Fork(event) => &event.secret,
            Self::IssueComment(event) => &event.secret,
            Self::Issues(event) => &event.secret,
            Self::PullRequest(event) => &event.secret,
            Self::Push(event) => &event.secret,
            Self::Release(event) => &event.secret,
            Self::Repository(event) => &event.secret,
        }
    }
}

/// Gitea encodes empty lists as `null`, treat it like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Deserialize)]
pub struct GiteaUser {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub full_name: String,
}

impl GiteaUser {
    /// The user's full name, or their login when they haven't set one.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.login
        } else {
            &self.full_name
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    pub assignee: Option<GiteaUser>,
}

#[derive(Debug, Deserialize)]
pub struct Comment {
    pub user: GiteaUser,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub html_url: String,
}
