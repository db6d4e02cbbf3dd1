use crate::{
    bot::{utils::shorten_content, Notification},
    webhooks::gitea::{
        CreateEvent, DeleteEvent, ForkEvent, GiteaUser, IssueCommentEvent, IssuesEvent,
        PullRequestEvent, PushEvent, ReleaseEvent, RepositoryEvent, WebhookEvent,
    },
};

const COMMIT_TITLE_LENGTH: usize = 50;

/// Renders the message announcing `event`, if it should be announced at all.
pub fn handle_gitea_event(event: &WebhookEvent) -> Option<Notification> {
    let message = match event {
        WebhookEvent::Create(event) => Some(handle_create(event)),
        WebhookEvent::Delete(event) => Some(handle_delete(event)),
        WebhookEvent::Fork(event) => Some(handle_fork(event)),
        WebhookEvent::IssueComment(event) => handle_issue_comment(event),
        WebhookEvent::Issues(event) => Some(handle_issues(event)),
        WebhookEvent::PullRequest(event) => Some(handle_pull_request(event)),
        WebhookEvent::Push(event) => handle_push(event),
        WebhookEvent::Release(event) => handle_release(event),
        WebhookEvent::Repository(event) => handle_repository(event),
    }?;

    Some(Notification {
        message,
        repo: event.repository().to_owned(),
        secret: event.secret().to_owned(),
    })
}

fn handle_push(event: &PushEvent) -> Option<String> {
    // Gitea sends a push without commits when a release is created
    let last_commit = event.commits.last()?;

    let count = event.commits.len();
    let mut message = format!(
        "{} pushed {} commit{} to {} {}:\n",
        event.pusher.display_name(),
        count,
        if count == 1 { "" } else { "s" },
        event.repository.full_name,
        event.branch(),
    );

    for commit in &event.commits {
        message.push_str("- ");
        message.push_str(&shorten_content(commit.title(), COMMIT_TITLE_LENGTH));
        message.push('\n');
    }

    message.push('\n');
    message.push_str(&last_commit.url);

    Some(message)
}

fn handle_create(event: &CreateEvent) -> String {
    format!(
        "Created new {} {} in repo {}",
        event.ref_type, event.r#ref, event.repository.full_name
    )
}

fn handle_delete(event: &DeleteEvent) -> String {
    format!(
        "Deleted {} {} in repo {}",
        event.ref_type, event.r#ref, event.repository.full_name
    )
}

fn handle_fork(event: &ForkEvent) -> String {
    format!(
        "{} has been forked to {}",
        event.forkee.full_name, event.repository.full_name
    )
}

fn handle_issues(event: &IssuesEvent) -> String {
    let actor = event.sender.display_name();
    let action = event.action.as_str();
    let issue = &event.issue;
    let repo = &event.repository.full_name;

    match action {
        "opened" | "closed" | "reopened" | "edited" => format!(
            "{} {} issue \"{}\" (#{}) on {}: {}",
            actor, action, issue.title, issue.number, repo, issue.html_url
        ),
        "assigned" => format!(
            "{} {} issue \"{}\" (#{}) on {}{}: {}",
            actor,
            action,
            issue.title,
            issue.number,
            repo,
            assigned_to(issue.assignee.as_ref()),
            issue.html_url
        ),
        _ => format!("{} {} issue #{}", actor, action, issue.number),
    }
}

fn handle_issue_comment(event: &IssueCommentEvent) -> Option<String> {
    let actor = event.comment.user.display_name();
    let issue = &event.issue;
    let comment = &event.comment;
    let noun = if event.is_pull { "PR" } else { "issue" };

    let header = |verb: &str| {
        format!(
            "{} {} {} \"{}\" (#{}) on {}:\n{}",
            actor, verb, noun, issue.title, issue.number, event.repository.full_name, comment.body
        )
    };

    match event.action.as_str() {
        "created" => Some(format!("{}\n{}", header("commented on"), comment.html_url)),
        // the comment is gone, so is its URL
        "deleted" => Some(header("deleted their comment on")),
        "edited" => Some(format!(
            "{}\n{}",
            header("edited their comment on"),
            comment.html_url
        )),
        _ => None,
    }
}

fn handle_repository(event: &RepositoryEvent) -> Option<String> {
    match event.action.as_str() {
        "created" | "deleted" => Some(format!(
            "{} {} repository {}",
            event.sender.display_name(),
            event.action,
            event.repository.full_name
        )),
        _ => None,
    }
}

fn handle_release(event: &ReleaseEvent) -> Option<String> {
    let release = &event.release;
    let message = format!(
        "{} {} release \"{}\" ({}) in {}",
        event.sender.display_name(),
        event.action,
        release.name,
        release.tag_name,
        event.repository.full_name
    );

    match event.action.as_str() {
        "published" | "updated" => Some(format!("{}: {}", message, release.tarball_url)),
        "deleted" => Some(message),
        _ => None,
    }
}

fn handle_pull_request(event: &PullRequestEvent) -> String {
    let actor = event.sender.display_name();
    let action = event.action.as_str();
    let pr = &event.pull_request;
    let repo = &event.repository.full_name;

    match action {
        "opened" | "closed" | "reopened" | "edited" => format!(
            "{} {} PR \"{}\" (#{}) on {} from source {}: {}",
            actor,
            action,
            pr.title,
            pr.number,
            repo,
            pr.source(),
            pr.html_url
        ),
        "assigned" => format!(
            "{} {} PR \"{}\" (#{}) on {}{}: {}",
            actor,
            action,
            pr.title,
            pr.number,
            repo,
            assigned_to(pr.assignee.as_ref()),
            pr.html_url
        ),
        _ => format!("{} {} PR #{}", actor, action, pr.number),
    }
}

fn assigned_to(assignee: Option<&GiteaUser>) -> String {
    assignee
        .map(|user| format!(" to {}", user.display_name()))
        .unwrap_or_default()
}
