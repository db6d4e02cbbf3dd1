use serde::Deserialize;

use crate::webhooks::gitea::events::{Comment, Issue, Repository};

#[derive(Debug, Deserialize)]
pub struct IssueCommentEvent {
    #[serde(default)]
    pub secret: String,
    pub action: String,
    pub issue: Issue,
    pub comment: Comment,
    pub repository: Repository,
    #[serde(default)]
    pub is_pull: bool,
}
