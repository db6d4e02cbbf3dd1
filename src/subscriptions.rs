use anyhow::bail;
use lazy_static::lazy_static;
use matrix_sdk::ruma::RoomId;
use regex::Regex;
use url::Url;

use crate::{
    registry::SubscriptionRegistry,
    webhooks::gitea::{signing::expected_token, WEBHOOK_PATH},
};

lazy_static! {
    static ref REPO_FULL_NAME: Regex = Regex::new(r"^[\w.-]+/[\w.-]+$").unwrap();
}

fn validate_repo(repo: &str) -> anyhow::Result<()> {
    if !REPO_FULL_NAME.is_match(repo) {
        bail!("`{}` doesn't look like a repository (owner/project)", repo);
    }
    Ok(())
}

fn validate_room(room: &str) -> anyhow::Result<()> {
    if let Err(e) = RoomId::try_from(room) {
        bail!("`{}` isn't a valid room id: {}", room, e);
    }
    Ok(())
}

/// Subscribes `room` to events of `repo`, and returns the token the room's hook must use.
pub fn subscribe(
    registry: &dyn SubscriptionRegistry,
    secret: &str,
    room: &str,
    repo: &str,
) -> anyhow::Result<String> {
    validate_room(room)?;
    validate_repo(repo)?;

    let repo = repo.to_lowercase();
    let token = expected_token(&repo, room, secret);
    registry.insert(room, &repo, &token)?;

    Ok(token)
}

/// Returns whether `room` was subscribed to `repo`.
pub fn unsubscribe(
    registry: &dyn SubscriptionRegistry,
    room: &str,
    repo: &str,
) -> anyhow::Result<bool> {
    validate_room(room)?;
    validate_repo(repo)?;

    registry.delete(room, repo)
}

pub fn list(registry: &dyn SubscriptionRegistry, room: &str) -> anyhow::Result<Vec<String>> {
    validate_room(room)?;

    registry.list(room)
}

/// Tells the room's admins how to set up the Gitea hook for a fresh subscription.
pub fn setup_instructions(gitea_url: &Url, public_url: &Url, repo: &str, token: &str) -> String {
    format!(
        "To configure your project to send notifications, go to {}/{}/settings/hooks and add a new Gitea webhook.\n\
         For \"Target URL\", enter `{}{}`.\n\
         \"HTTP Method\" is POST and the \"Content Type\" is application/json.\n\
         For \"Secret\", enter `{}`.\n\
         Remember to check all the triggers you would like me to update you on.\n\
         \n\
         Happy coding!",
        gitea_url.as_str().trim_end_matches('/'),
        repo,
        public_url.as_str().trim_end_matches('/'),
        WEBHOOK_PATH,
        token
    )
}
